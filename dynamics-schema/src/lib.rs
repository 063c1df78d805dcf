//! Declarative schema provisioning for Dataverse / Dynamics 365
//!
//! A JSON description of entities, fields, keys and relationships is
//! resolved into Dataverse names and shapes, compared against a snapshot of
//! the target environment, and everything missing is created. Running the
//! same description twice creates nothing the second time.

pub mod api;
pub mod cli;
pub mod config;
pub mod schema;
pub mod sync;
