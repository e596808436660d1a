//! # Request and Key Records
//!
//! Plain data types shared by the store, the orchestrator and any transport
//! layer built on top of them.
//!
//! - [`ValidatorRequest`] - one batch request and its lifecycle status
//! - [`ValidatorKey`] - one generated key, owned by exactly one request
//! - [`CreateAck`] - the synchronous answer to a creation call
//! - [`StatusView`] - what a poller sees for a request

use crate::{Error, FeeRecipient};
use chrono::{DateTime, Utc};
use core::fmt;
use core::str::FromStr;
use uuid::Uuid;

/// Identifier of a [`ValidatorRequest`].
///
/// A random (v4) UUID, rendered in its hyphenated lowercase form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a [`ValidatorKey`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct KeyId(Uuid);

impl KeyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for KeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle status of a request.
///
/// `Started` is the only non-terminal state. A request moves from `Started`
/// to exactly one of `Successful` or `Failed` and never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    Started,
    Successful,
    Failed,
}

impl Status {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            other => Err(Error::invalid_input(format!("unknown status `{other}`"))),
        }
    }
}

/// A request to provision `requested_count` keys for `fee_recipient`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidatorRequest {
    pub id: RequestId,
    pub requested_count: u64,
    pub fee_recipient: FeeRecipient,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set iff `status` is [`Status::Failed`].
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error_message: Option<String>,
}

impl ValidatorRequest {
    /// Builds a fresh `started` request with a new identifier.
    pub fn new(requested_count: u64, fee_recipient: FeeRecipient) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            requested_count,
            fee_recipient,
            status: Status::Started,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }
}

/// One generated key. The fee recipient is copied from the owning request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidatorKey {
    pub id: KeyId,
    pub request_id: RequestId,
    pub value: String,
    pub fee_recipient: FeeRecipient,
    pub created_at: DateTime<Utc>,
}

impl ValidatorKey {
    pub fn new(request_id: RequestId, value: String, fee_recipient: FeeRecipient) -> Self {
        Self {
            id: KeyId::new(),
            request_id,
            value,
            fee_recipient,
            created_at: Utc::now(),
        }
    }
}

/// Synchronous acknowledgement of an accepted request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreateAck {
    pub request_id: RequestId,
    pub message: String,
}

/// Poll result for a request.
///
/// `keys` is only populated for [`Status::Successful`] and `message` only for
/// [`Status::Failed`]. A `Started` view carries neither.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusView {
    pub status: Status,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub keys: Vec<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_round_trip() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);

        let text = a.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<RequestId>().unwrap(), a);
        assert!("not-a-uuid".parse::<RequestId>().is_err());
    }

    #[test]
    fn status_strings() {
        for status in [Status::Started, Status::Successful, Status::Failed] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("pending".parse::<Status>().is_err());
        assert!(!Status::Started.is_terminal());
        assert!(Status::Successful.is_terminal());
        assert!(Status::Failed.is_terminal());
    }

    #[test]
    fn new_request_starts_without_message() {
        let recipient = FeeRecipient::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap();
        let request = ValidatorRequest::new(3, recipient);
        assert_eq!(request.status, Status::Started);
        assert_eq!(request.requested_count, 3);
        assert!(request.error_message.is_none());
        assert_eq!(request.created_at, request.updated_at);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn status_view_omits_empty_fields() {
        let view = StatusView {
            status: Status::Started,
            keys: Vec::new(),
            message: None,
        };
        assert_eq!(
            serde_json::to_string(&view).unwrap(),
            r#"{"status":"started"}"#
        );

        let view = StatusView {
            status: Status::Failed,
            keys: Vec::new(),
            message: Some("Error saving validator keys".into()),
        };
        assert_eq!(
            serde_json::to_string(&view).unwrap(),
            r#"{"status":"failed","message":"Error saving validator keys"}"#
        );
    }
}
