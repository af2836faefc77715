// src/validate/sites.rs
//! Validation for collaborative sites.
//!
//! The skip rules here match on URL shape. That is a naming convention of
//! the service, not a documented contract, so both rules live in their own
//! functions where they can be revised without touching the rest.

use chrono::{DateTime, Utc};

use super::{check_shape_and_id, ItemValidator, SkipReason, Validation};
use crate::api::RawItem;
use crate::constants::{PERSONAL_SITE_PATH, SEARCH_SITE_SUFFIX};
use crate::directory::{ResourceKind, Site};
use crate::fault::{ItemProblem, RecoverableFailure};
use crate::types::SiteId;

/// Accepts sites with an `id`, a parseable `webUrl` and a display name,
/// leaving out personal sites and the built-in search site.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteValidator;

/// Personal sites are filtered client-side; the collection endpoint cannot
/// exclude them.
fn exclusion_for(web_url: &str) -> Option<SkipReason> {
    web_url
        .contains(PERSONAL_SITE_PATH)
        .then_some(SkipReason::PersonalSite)
}

/// The only site known to legitimately lack a display name.
fn explains_missing_name(web_url: &str) -> Option<SkipReason> {
    web_url
        .trim_end_matches('/')
        .ends_with(SEARCH_SITE_SUFFIX)
        .then_some(SkipReason::BuiltInSearchSite)
}

impl ItemValidator for SiteValidator {
    type Item = Site;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Site
    }

    fn validate(&self, raw: &RawItem) -> Validation<Site> {
        let kind = self.kind();
        let raw_id = match check_shape_and_id(kind, raw) {
            Ok(id) => id,
            Err(failure) => return Validation::Invalid(failure),
        };
        let fail = |problem: ItemProblem| -> Validation<Site> {
            Validation::Invalid(RecoverableFailure::new(kind, Some(raw_id), problem))
        };

        let id = match SiteId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => return fail(ItemProblem::InvalidId(e.to_string())),
        };

        let Some(web_url) = raw.str_field("webUrl") else {
            return fail(ItemProblem::MissingField("webUrl"));
        };

        if let Some(reason) = exclusion_for(web_url) {
            return Validation::Skipped(reason);
        }

        let Some(display_name) = raw.str_field("displayName") else {
            return match explains_missing_name(web_url) {
                Some(reason) => Validation::Skipped(reason),
                None => fail(ItemProblem::MissingField("displayName")),
            };
        };

        let parsed_url = match url::Url::parse(web_url) {
            Ok(url) => url,
            Err(e) => {
                return fail(ItemProblem::InvalidField {
                    field: "webUrl",
                    reason: e.to_string(),
                })
            }
        };

        let created = raw
            .str_field("createdDateTime")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Validation::Accepted(Site {
            id,
            web_url: parsed_url,
            display_name: display_name.to_string(),
            name: raw.str_field("name").map(str::to_string),
            created,
        })
    }
}
