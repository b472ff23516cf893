//! Entity type definitions
//!
//! QMS keeps the following record types:
//!
//! **Quality:**
//! - [`Rnc`] - Non-conformance reports with disposition and containment
//! - [`Calibration`] - Measuring equipment and its calibration cycle
//! - [`InspectionReport`] - Inspection reports with evaluated measurements
//! - [`Lesson`] - Lessons learned, numbered per year
//! - [`ActionPlan`] - Corrective-action plans with tracked actions
//!
//! **Sales:**
//! - [`Quote`] - Customer quotations with items and lead times
//! - [`SalesOrder`] - Orders converted from approved quotes

pub mod action_plan;
pub mod calibration;
pub mod inspection;
pub mod lesson;
pub mod order;
pub mod quote;
pub mod rnc;

pub use action_plan::ActionPlan;
pub use calibration::Calibration;
pub use inspection::{InspectionReport, Measurement};
pub use lesson::Lesson;
pub use order::SalesOrder;
pub use quote::{Quote, QuoteError};
pub use rnc::Rnc;
