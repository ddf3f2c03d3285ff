//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `accreditation` - Accreditation aggregate, status machine and audit events

pub mod accreditation;
pub mod foundation;
