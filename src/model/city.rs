//! City records: persisted favourites and raw autocomplete entries

use serde::{Deserialize, Serialize};

use super::predicate::Queryable;

/// A city the user saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub name: String,
    pub country: String,
}

impl FavoriteCity {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }

    /// Section title used by the favourites list.
    pub fn section_title(&self) -> String {
        self.name.clone()
    }
}

impl Queryable for FavoriteCity {
    const FIELDS: &'static [&'static str] = &["name", "country"];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "country" => Some(&self.country),
            _ => None,
        }
    }
}

/// An autocomplete result, `"<name>,<region>,<country>"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CityListItem {
    raw: String,
}

impl CityListItem {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.raw.split(',').nth(index).map(str::trim)
    }

    pub fn name(&self) -> &str {
        self.field(0).unwrap_or_default()
    }

    pub fn region(&self) -> &str {
        self.field(1).unwrap_or_default()
    }

    /// Empty when the entry has fewer than three fields.
    pub fn country(&self) -> &str {
        self.field(2).unwrap_or_default()
    }

    pub fn to_favorite(&self) -> FavoriteCity {
        FavoriteCity::new(self.name(), self.country())
    }
}

impl From<String> for CityListItem {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
