//! Dynamics 365 Operations Module
//!
//! Schema creation requests and their results.

pub mod operation;

pub use operation::{Operation, OperationResult};
