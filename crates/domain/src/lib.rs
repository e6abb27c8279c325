//! # comfortzone-domain
//!
//! Pure domain model for the comfortzone edge comfort agent.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **ComfortSettings** (desired targets) and their partial updates
//! - Define **SensorReading** (one fused reading per cycle)
//! - Debounce **occupancy** from raw motion polls
//! - Decide **comfort status** and fan state, hysteresis included
//! - Describe the **shadow** document shapes and parse inbound deltas
//! - Define **telemetry** and **preferences** records and topic naming
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod comfort;
pub mod occupancy;
pub mod preferences;
pub mod reading;
pub mod settings;
pub mod shadow;
pub mod telemetry;
pub mod topics;
