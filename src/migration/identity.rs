//! Identity fields carried by a Contributor before migration and by an Alias after

use super::error::{MigrationError, MigrationResult};
use crate::graph::{PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};

/// Property holding a Contributor's stable identifier
pub const CONTRIBUTOR_ID_KEY: &str = "id";

/// Property marking the authoritative alias
pub const IS_PRIMARY_KEY: &str = "is_primary";

/// Names of the properties moved between Contributor and Alias
pub const IDENTITY_FIELDS: [&str; 5] =
    ["openid", "email", "affiliation", "first_name", "last_name"];

/// Identity-bearing fields, each explicitly optional.
///
/// A missing property and a null property both read as `None`, and `None` is
/// never written back as a property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl IdentityFields {
    /// Read the identity fields out of a property map.
    ///
    /// `owner` names the entity in errors. Any non-string, non-null value is
    /// rejected so that nothing is silently dropped on the way to the alias.
    pub fn from_properties(owner: &str, properties: &PropertyMap) -> MigrationResult<Self> {
        let read = |field: &'static str| -> MigrationResult<Option<String>> {
            match properties.get(field) {
                None | Some(PropertyValue::Null) => Ok(None),
                Some(PropertyValue::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(MigrationError::MalformedField {
                    owner: owner.to_string(),
                    field,
                    found: other.type_name(),
                }),
            }
        };

        Ok(Self {
            openid: read("openid")?,
            email: read("email")?,
            affiliation: read("affiliation")?,
            first_name: read("first_name")?,
            last_name: read("last_name")?,
        })
    }

    /// Forward guard: at least one of `openid` / `email` holds a non-empty value
    pub fn has_migratable_identity(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.openid) || present(&self.email)
    }

    /// True when no field is set at all
    pub fn is_empty(&self) -> bool {
        self.fields().all(|(_, v)| v.is_none())
    }

    /// `(name, value)` pairs in canonical field order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
        [
            ("openid", self.openid.as_deref()),
            ("email", self.email.as_deref()),
            ("affiliation", self.affiliation.as_deref()),
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
        ]
        .into_iter()
    }

    /// Properties for the fields that are set
    pub fn to_properties(&self) -> PropertyMap {
        self.fields()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), PropertyValue::from(v))))
            .collect()
    }
}
