//! Shared types for Skydeck

pub mod error;

pub use error::{Result, SkydeckError};
