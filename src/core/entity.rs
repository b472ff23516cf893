//! Entity trait - common interface for all record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;

/// Common trait for all quality records
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity id prefix (e.g., "RNC", "CAL")
    const PREFIX: EntityPrefix;

    /// Get the record's unique ID
    fn id(&self) -> &EntityId;

    /// Get the record's sequential number, if one was allocated
    fn number(&self) -> Option<&str>;

    /// Sequence family the record draws its number from
    fn family(&self) -> SequenceFamily;

    /// Get the record's title
    fn title(&self) -> &str;

    /// Get the record's workflow state
    fn state(&self) -> String;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;

    /// Number if allocated, otherwise the full id
    fn display_ref(&self) -> String {
        self.number()
            .map(str::to_string)
            .unwrap_or_else(|| self.id().to_string())
    }
}

pub(crate) fn default_revision() -> u32 {
    1
}
