use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Direction of a call as reported by the telephony layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    In,
    Out,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Immutable snapshot of call details supplied by the telephony layer.
///
/// A fresh snapshot is delivered every time any field changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMetadata {
    /// Creation time of the call.
    pub timestamp: DateTime<FixedOffset>,

    /// `None` when the direction is unknown or unsupported.
    pub direction: Option<CallDirection>,

    /// Zero-based subscription slot the call is using.
    pub sim_slot: Option<u32>,

    pub phone_number: Option<String>,

    /// Display name provided by the network.
    pub caller_name: Option<String>,

    /// Display name of the matching address book entry.
    pub contact_name: Option<String>,
}

impl CallMetadata {
    pub fn new(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            direction: None,
            sim_slot: None,
            phone_number: None,
            caller_name: None,
            contact_name: None,
        }
    }
}

/// Device state consulted while resolving filename variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceContext {
    /// Number of active telephony subscriptions.
    pub active_subscriptions: usize,

    pub can_read_phone_state: bool,

    pub can_read_contacts: bool,
}
