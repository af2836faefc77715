// src/directory.rs
//! Validated directory objects.
//!
//! These are the typed values a fetch hands back to its caller. Each one is
//! only ever built by a validator, so holding one means the identifier and
//! the contract's mandatory fields are present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::types::{SiteId, UserId};

/// The kind of collection an item was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Site,
}

impl ResourceKind {
    /// The `@odata.type` the service stamps on items of this kind.
    pub fn odata_type(&self) -> &'static str {
        match self {
            ResourceKind::User => "#microsoft.graph.user",
            ResourceKind::Site => "#microsoft.graph.site",
        }
    }

    /// Collection path segment under the API root.
    pub fn collection_path(&self) -> &'static str {
        match self {
            ResourceKind::User => "users",
            ResourceKind::Site => "sites",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::User => write!(f, "user"),
            ResourceKind::Site => write!(f, "site"),
        }
    }
}

/// A licensed member of the tenant directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub principal_name: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
}

/// A collaborative (non-personal) site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub web_url: url::Url,
    pub display_name: String,
    pub name: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

impl Site {
    /// The host the site lives on, e.g. `contoso.sharepoint.com`.
    pub fn host(&self) -> Option<&str> {
        self.web_url.host_str()
    }
}

/// Case-insensitive mapping between user ids and principal names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdNameLookup {
    id_to_name: HashMap<String, String>,
    name_to_id: HashMap<String, String>,
}

impl IdNameLookup {
    /// Indexes users by lowercased id and principal name. A later user with
    /// the same id replaces an earlier one.
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut lookup = Self::default();
        for user in users {
            let id = user.id.as_str().to_lowercase();
            let name = user.principal_name.to_lowercase();
            if let Some(previous) = lookup.id_to_name.insert(id.clone(), name.clone()) {
                lookup.name_to_id.remove(&previous);
            }
            lookup.name_to_id.insert(name, id);
        }
        lookup
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.id_to_name.get(&id.to_lowercase()).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.name_to_id.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.id_to_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, principal_name: &str) -> User {
        User {
            id: UserId::parse(id).unwrap(),
            principal_name: principal_name.to_string(),
            display_name: None,
            mail: None,
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive_both_ways() {
        let users = [user("ABC-1", "Alice@Contoso.com"), user("def-2", "bob@contoso.com")];
        let lookup = IdNameLookup::from_users(&users);

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.name_of("abc-1"), Some("alice@contoso.com"));
        assert_eq!(lookup.name_of("ABC-1"), Some("alice@contoso.com"));
        assert_eq!(lookup.id_of("BOB@contoso.com"), Some("def-2"));
        assert_eq!(lookup.name_of("missing"), None);
    }

    #[test]
    fn test_repeated_id_keeps_the_latest_name() {
        let users = [user("u1", "old@contoso.com"), user("U1", "new@contoso.com")];
        let lookup = IdNameLookup::from_users(&users);

        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.name_of("u1"), Some("new@contoso.com"));
        assert_eq!(lookup.id_of("old@contoso.com"), None);
    }
}
