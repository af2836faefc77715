// src/validate/mod.rs
//! Per-item validation: one raw item in, exactly one classification out.
//!
//! Validators share a rule order: check the shape, require the identifier,
//! require the contract's fields (unless a known benign pattern explains a
//! gap), then apply exclusion rules. They are pure: the same raw item always
//! yields the same [`Validation`].

mod sites;
mod users;

pub use sites::SiteValidator;
pub use users::UserValidator;

use serde::Serialize;
use std::fmt;

use crate::api::RawItem;
use crate::directory::ResourceKind;
use crate::fault::{ItemProblem, RecoverableFailure};

/// A known, benign reason an item is left out of a collection.
///
/// Skips are not errors: they are never recorded as failures and never
/// logged above debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A single user's personal (OneDrive) site.
    PersonalSite,
    /// The tenant's built-in search site, which never has a display name.
    BuiltInSearchSite,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PersonalSite => write!(f, "personal site"),
            SkipReason::BuiltInSearchSite => write!(f, "built-in search site"),
        }
    }
}

/// The outcome of validating one raw item.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Accepted(T),
    Skipped(SkipReason),
    Invalid(RecoverableFailure),
}

impl<T> Validation<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }

    pub fn map<U, F>(self, f: F) -> Validation<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Validation::Accepted(value) => Validation::Accepted(f(value)),
            Validation::Skipped(reason) => Validation::Skipped(reason),
            Validation::Invalid(failure) => Validation::Invalid(failure),
        }
    }
}

/// Turns raw items of one resource kind into typed values.
pub trait ItemValidator {
    type Item;

    /// The kind of resource this validator accepts.
    fn kind(&self) -> ResourceKind;

    fn validate(&self, raw: &RawItem) -> Validation<Self::Item>;
}

/// Rule 1 and 2 of every validator: the item must be an object of the
/// expected kind, and it must carry a non-empty `id`.
///
/// Returns the identifier on success.
pub(crate) fn check_shape_and_id(
    kind: ResourceKind,
    raw: &RawItem,
) -> Result<&str, RecoverableFailure> {
    if !raw.as_value().is_object() {
        return Err(RecoverableFailure::new(
            kind,
            None,
            ItemProblem::UnexpectedType {
                found: raw.shape().to_string(),
            },
        ));
    }

    if let Some(odata_type) = raw.odata_type() {
        if odata_type != kind.odata_type() {
            return Err(RecoverableFailure::new(
                kind,
                raw.id(),
                ItemProblem::UnexpectedType {
                    found: odata_type.to_string(),
                },
            ));
        }
    }

    raw.id()
        .ok_or_else(|| RecoverableFailure::new(kind, None, ItemProblem::MissingId))
}
