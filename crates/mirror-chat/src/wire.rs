//! Web API response shapes

use crate::error::{ChatError, ChatResult};
use mirror_directory::{RemoteChannel, RemoteUser};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Check the `ok` flag of a response envelope and hand back the body.
pub(crate) fn check_envelope(body: Value) -> ChatResult<Value> {
    match body.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(body),
        Some(false) => {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            Err(ChatError::Api(error.to_string()))
        }
        None => Err(ChatError::Decode("missing ok flag".to_string())),
    }
}

/// Take and decode one field of a checked envelope.
pub(crate) fn field<T: DeserializeOwned>(body: &mut Value, name: &str) -> ChatResult<T> {
    let value = body
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| ChatError::Decode(format!("missing field `{}`", name)))?;
    Ok(serde_json::from_value(value)?)
}

/// Cursor for the next page, if any.
pub(crate) fn next_cursor(body: &Value) -> Option<String> {
    body.pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub purpose: Option<WirePurpose>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePurpose {
    #[serde(default)]
    pub value: String,
}

impl From<WireChannel> for RemoteChannel {
    fn from(wire: WireChannel) -> Self {
        RemoteChannel {
            id: wire.id,
            name: wire.name,
            is_archived: wire.is_archived,
            purpose: wire.purpose.map(|p| p.value).unwrap_or_default(),
            members: wire.members,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: Option<WireProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireProfile {
    #[serde(default)]
    pub email: Option<String>,
}

impl WireUser {
    /// Active users with an email become directory entries
    pub fn into_remote(self) -> Option<RemoteUser> {
        if self.deleted {
            return None;
        }
        let email = self.profile?.email.filter(|e| !e.trim().is_empty())?;
        Some(RemoteUser {
            id: self.id,
            contact_address: Some(email),
        })
    }
}
