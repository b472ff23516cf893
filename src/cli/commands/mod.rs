//! CLI command implementations

pub mod cal;
pub mod completions;
pub mod init;
pub mod insp;
pub mod lesson;
pub mod order;
pub mod plan;
pub mod quote;
pub mod rnc;
pub mod seq;
pub mod tol;
