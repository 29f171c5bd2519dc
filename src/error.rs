//! Error types for catalog lookups and chain calculations

use thiserror::Error;

/// Errors surfaced by the catalog, the chain expander and the aggregator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("item '{0}' is not in the catalog")]
    NotFound(String),

    #[error("invalid target rate {rate}/sec for '{name}'")]
    InvalidTarget { name: String, rate: f64 },

    #[error("cannot combine chains of different items: '{left}' and '{right}'")]
    NameMismatch { left: String, right: String },

    #[error("got {depths} depth bounds for {nodes} chains")]
    LengthMismatch { nodes: usize, depths: usize },

    #[error("invalid recipe '{name}': {reason}")]
    InvalidRecipe { name: String, reason: String },
}

pub type Result<T, E = CalcError> = std::result::Result<T, E>;
