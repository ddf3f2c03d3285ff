//! Accreditation Service - Accreditation Lifecycle Controller
//!
//! This crate manages the lifecycle of a user's accreditation request
//! (PENDING → CONFIRMED / EXPIRED / FAILED), guarding every status change
//! with an optimistic version check and coupling it to exactly one audit
//! event written through a transactional outbox.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
