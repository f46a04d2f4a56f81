//! Failures of a single resolve attempt

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ResolveError {
    #[error("No target item selected")]
    MissingTarget,

    #[error("Target rate must be a positive number, got {0}")]
    InvalidRate(f64),

    #[error("Unknown item '{0}'")]
    UnknownItem(String),

    #[error("No production chain found for '{0}'")]
    EmptyChain(String),

    #[error("No solution for '{0}': the recipe selection gives a singular system")]
    Unsolvable(String),
}

impl ResolveError {
    /// Whether the request was rejected before any computation ran
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::MissingTarget | Self::InvalidRate(_) | Self::UnknownItem(_)
        )
    }
}
