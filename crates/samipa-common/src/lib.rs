//! Common types, traits, and utilities for the Samipa ANN index.
//!
//! This crate provides the foundational pieces shared by every index
//! variant: error handling, configuration, degree policies, and the
//! polymorphic index trait consumed by external harnesses.

pub mod config;
pub mod degree;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use degree::*;
pub use error::{Result, SamipaError};
pub use traits::*;
pub use types::*;
