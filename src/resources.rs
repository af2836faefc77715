// src/resources.rs
//! Typed entry points for the collections this crate knows about.
//!
//! [`Users`] and [`Sites`] pair a query with its validator, so callers ask
//! for "all users" rather than assembling the pieces themselves. Each also
//! offers a single-object read that goes through the same retry policy and
//! the same validation rules as a collection walk.

use crate::api::{ObjectSource, PageSource, ResourceQuery};
use crate::directory::{IdNameLookup, Site, User};
use crate::error::AppError;
use crate::fetcher::{CollectionFetcher, FetchOutcome};
use crate::retry::retry_with_backoff;
use crate::types::{SiteId, UserId};
use crate::validate::{ItemValidator, SiteValidator, UserValidator, Validation};

/// Reads one object, retrying transient failures, then validates it.
///
/// A single read has no aggregator to report to, so a skip or a failed
/// validation becomes the error of the call.
async fn get_validated<S, V>(
    fetcher: &CollectionFetcher,
    source: &S,
    validator: &V,
    id: &str,
) -> Result<V::Item, AppError>
where
    S: ObjectSource + ?Sized,
    V: ItemValidator,
{
    let kind = validator.kind();
    let label = format!("fetching {} {}", kind, id);
    let raw = retry_with_backoff(
        &fetcher.options().walk.retry,
        fetcher.cancel_token(),
        &label,
        || source.get_object(kind, id),
    )
    .await?;

    match validator.validate(&raw) {
        Validation::Accepted(item) => Ok(item),
        Validation::Skipped(reason) => Err(AppError::Skipped {
            id: id.to_string(),
            reason,
        }),
        Validation::Invalid(failure) => Err(AppError::InvalidItem(failure)),
    }
}

/// The tenant's member users.
pub struct Users<'a, S: ?Sized> {
    source: &'a S,
    fetcher: &'a CollectionFetcher,
    page_size: Option<u32>,
}

impl<'a, S: ?Sized> Users<'a, S> {
    pub fn new(source: &'a S, fetcher: &'a CollectionFetcher) -> Self {
        Self {
            source,
            fetcher,
            page_size: None,
        }
    }

    /// Overrides the `$top` page size.
    pub fn page_size(self, page_size: Option<u32>) -> Self {
        Self { page_size, ..self }
    }

    pub fn query(&self) -> ResourceQuery {
        ResourceQuery::users().with_top(self.page_size)
    }
}

impl<S: PageSource + ?Sized> Users<'_, S> {
    /// Every valid member user, plus the accounting for the rest.
    pub async fn get_all(&self) -> FetchOutcome<User> {
        self.fetcher
            .fetch(self.source, &self.query(), &UserValidator)
            .await
    }

    /// Every valid member user indexed by lowercased id and principal name.
    ///
    /// The lookup holds whatever was accepted before the fetch ended, so
    /// check the outcome's verdict before treating it as complete.
    pub async fn get_all_ids_and_names(&self) -> (IdNameLookup, FetchOutcome<User>) {
        let outcome = self.get_all().await;
        let lookup = IdNameLookup::from_users(&outcome.items);
        (lookup, outcome)
    }
}

impl<S: ObjectSource + ?Sized> Users<'_, S> {
    pub async fn get_by_id(&self, id: &str) -> Result<User, AppError> {
        let id = UserId::parse(id).map_err(|e| AppError::InvalidId(e.to_string()))?;
        get_validated(self.fetcher, self.source, &UserValidator, id.as_str()).await
    }

    /// The user's canonical id and principal name.
    pub async fn get_id_and_name(&self, id: &str) -> Result<(UserId, String), AppError> {
        let user = self.get_by_id(id).await?;
        Ok((user.id, user.principal_name))
    }
}

/// The tenant's collaborative sites.
pub struct Sites<'a, S: ?Sized> {
    source: &'a S,
    fetcher: &'a CollectionFetcher,
    page_size: Option<u32>,
}

impl<'a, S: ?Sized> Sites<'a, S> {
    pub fn new(source: &'a S, fetcher: &'a CollectionFetcher) -> Self {
        Self {
            source,
            fetcher,
            page_size: None,
        }
    }

    pub fn page_size(self, page_size: Option<u32>) -> Self {
        Self { page_size, ..self }
    }

    pub fn query(&self) -> ResourceQuery {
        ResourceQuery::sites().with_top(self.page_size)
    }
}

impl<S: PageSource + ?Sized> Sites<'_, S> {
    /// Every valid collaborative site. Personal sites and the search site
    /// are reported as skipped.
    pub async fn get_all(&self) -> FetchOutcome<Site> {
        self.fetcher
            .fetch(self.source, &self.query(), &SiteValidator)
            .await
    }
}

impl<S: ObjectSource + ?Sized> Sites<'_, S> {
    pub async fn get_by_id(&self, id: &str) -> Result<Site, AppError> {
        let id = SiteId::parse(id).map_err(|e| AppError::InvalidId(e.to_string()))?;
        get_validated(self.fetcher, self.source, &SiteValidator, id.as_str()).await
    }
}
