//! Core module - numbering, tolerance evaluation and the record store

pub mod config;
pub mod entity;
pub mod identity;
pub mod loader;
pub mod numbering;
pub mod project;
pub mod sequence;
pub mod shortid;
pub mod tolerance;

pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use numbering::{next_number, NumberSourceError, SequenceFamily};
pub use project::{Project, ProjectError};
pub use sequence::{allocate_next_number, NumberSource, SequenceFormat};
pub use shortid::ShortIdIndex;
pub use tolerance::{evaluate_tolerance, ToleranceRange, ToleranceSpec, ToleranceToken, Verdict};
