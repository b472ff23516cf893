//! QMS: plain-text quality records
//!
//! Non-conformance reports, calibrations, inspection reports, lessons
//! learned, action plans, quotations and sales orders kept as one YAML file
//! per record. Records carry a ULID-based id and an advisory sequential
//! number such as `RNC-0007`; inspection measurements are classified against
//! their drawing tolerances.

pub mod cli;
pub mod core;
pub mod entities;
