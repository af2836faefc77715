// src/types/mod.rs
//! Strongly typed identifiers and their validation errors.

use thiserror::Error;

mod ids;

pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),
}
