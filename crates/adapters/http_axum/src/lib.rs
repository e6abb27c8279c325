//! # comfortzone-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **preferences API** (`GET`/`POST /preferences`) backing the
//!   desired-state push towards devices
//! - Serve the **telemetry API** (`GET`/`POST /telemetry`) over the stored
//!   telemetry history
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results and errors into JSON responses
//!
//! ## Dependency rule
//! Depends on `comfortzone-app` (for port traits and services) and
//! `comfortzone-domain` (for request and record types). Never leaks axum
//! types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
