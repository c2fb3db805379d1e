//! Entity trait - common interface for all record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for all shop records
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// The record type prefix (e.g. ORC, CLI)
    const PREFIX: EntityPrefix;

    /// Get the record's unique ID
    fn id(&self) -> &EntityId;

    /// Short human-readable title for lists and messages
    fn title(&self) -> String;

    /// Current status label
    fn status(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Who registered the record
    fn author(&self) -> &str;
}

/// Serde default for `active` flags on registry records
pub(crate) fn default_active() -> bool {
    true
}

/// Status label shared by registry records that can be deactivated
pub(crate) fn active_label(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}
