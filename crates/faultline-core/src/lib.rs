//! # faultline-core
//!
//! Core types, traits, and errors for the faultline polarization platform.
//!
//! This crate defines the fundamental abstractions shared by all faultline
//! components:
//! - **Types**: statements, network matrices, bucket arrays, result series
//! - **Traits**: StatementSource, Aggregator
//! - **Config**: PolarizationConfig with warn-and-fall-back validation
//! - **Errors**: unified error handling with FaultlineError
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  faultline-core  │  ← types / traits / config
//! └──────────────────┘
//!          ▲
//!          │
//! ┌────────┴─────────┐
//! │ faultline-engine │  ← slicing, scoring, optimizers
//! └──────────────────┘
//!          ▲
//!          │
//! ┌────────┴─────────┐
//! │  faultline-cli   │
//! └──────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod traits;
pub mod types;

pub use config::{Algorithm, Kernel, PolarizationConfig, TimeWindow};
pub use errors::{FaultlineError, Result};
pub use traits::{Aggregator, StatementSource};
pub use types::{
    AttributeType, AttributeValue, BucketArray, Matrix, PolarizationResult,
    PolarizationResultTimeSeries, QualifierRole, Statement,
};
