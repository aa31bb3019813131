//! API request handlers

mod channels;
mod health;
mod webhook;

pub use channels::*;
pub use health::*;
pub use webhook::*;
