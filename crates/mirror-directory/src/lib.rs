//! Mirror Directory - channel directory reconciliation
//!
//! This crate keeps one chat channel per tracker project and decides, for a
//! project key, whether that channel must be created, unarchived, or have its
//! purpose updated:
//!
//! - **ChannelDirectory**: TTL-bounded cache of channel state per project key
//! - **UserDirectory**: bulk-loaded mapping from contact address to chat user id
//! - **ChannelReconciler**: drives a project's channel to `Active` with the
//!   desired purpose using the fewest remote calls
//! - **InvitationReconciler**: invites only users who are not already members
//!
//! Remote access goes through the [`ChannelApi`], [`UserDirectoryApi`] and
//! [`MessageApi`] traits. [`InMemoryChatApi`] implements all three for
//! development and testing; real deployments plug in an HTTP transport.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod clock;
pub mod directory;
pub mod error;
pub mod invite;
pub mod memory;
pub mod reconciler;
pub mod remote;
pub mod types;
pub mod users;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::ChannelDirectory;
pub use error::{DirectoryError, DirectoryResult, RemoteError, RemoteResult};
pub use invite::{InvitationReconciler, InviteFailure, InviteReport};
pub use memory::{ChatCall, InMemoryChatApi};
pub use reconciler::ChannelReconciler;
pub use remote::{
    ChannelApi, CreatedChannel, MessageApi, OutgoingMessage, RemoteChannel, RemoteUser,
    UserDirectoryApi,
};
pub use types::{ChannelEntry, ChannelState, ProjectKey};
pub use users::{normalize_address, UserDirectory};

/// Default time-to-live for both caches, in minutes.
pub const DEFAULT_TTL_MINUTES: u32 = 15;
