// src/validate/users.rs
//! Validation for directory users.

use super::{check_shape_and_id, ItemValidator, Validation};
use crate::api::RawItem;
use crate::directory::{ResourceKind, User};
use crate::fault::{ItemProblem, RecoverableFailure};
use crate::types::UserId;

/// Accepts users that carry an `id` and a `userPrincipalName`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserValidator;

impl ItemValidator for UserValidator {
    type Item = User;

    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    fn validate(&self, raw: &RawItem) -> Validation<User> {
        let kind = self.kind();
        let id = match check_shape_and_id(kind, raw) {
            Ok(id) => id,
            Err(failure) => return Validation::Invalid(failure),
        };

        let id = match UserId::parse(id) {
            Ok(id) => id,
            Err(e) => {
                return Validation::Invalid(RecoverableFailure::new(
                    kind,
                    Some(id),
                    ItemProblem::InvalidId(e.to_string()),
                ))
            }
        };

        let Some(principal_name) = raw.str_field("userPrincipalName") else {
            return Validation::Invalid(RecoverableFailure::new(
                kind,
                Some(id.as_str()),
                ItemProblem::MissingField("principalName"),
            ));
        };

        Validation::Accepted(User {
            principal_name: principal_name.to_string(),
            display_name: raw.str_field("displayName").map(str::to_string),
            mail: raw.str_field("mail").map(str::to_string),
            id,
        })
    }
}
