//! Filter and sort descriptors for store views
//!
//! Field names are checked against [`Queryable::FIELDS`] when a view is
//! opened, so a typo in a view definition fails at query time instead of
//! silently matching nothing.

use std::cmp::Ordering;

use crate::error::QueryError;

/// A record type that can be filtered and sorted by named string fields.
pub trait Queryable {
    const FIELDS: &'static [&'static str];

    fn field(&self, name: &str) -> Option<&str>;
}

/// Case-insensitive prefix match on one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    field: String,
    prefix: String,
}

impl Predicate {
    /// Built from raw user input; nothing in `prefix` is interpreted.
    pub fn begins_with(field: &str, prefix: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            prefix: prefix.into().to_lowercase(),
        }
    }

    pub fn validate<T: Queryable>(&self) -> Result<(), QueryError> {
        if T::FIELDS.contains(&self.field.as_str()) {
            Ok(())
        } else {
            Err(QueryError::UnknownField {
                field: self.field.clone(),
            })
        }
    }

    pub fn matches<T: Queryable>(&self, record: &T) -> bool {
        record
            .field(&self.field)
            .is_some_and(|actual| actual.to_lowercase().starts_with(&self.prefix))
    }
}

/// Single-key ordering for a view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ascending: true,
        }
    }

    pub fn validate<T: Queryable>(&self) -> Result<(), QueryError> {
        if T::FIELDS.contains(&self.key.as_str()) {
            Ok(())
        } else {
            Err(QueryError::UnknownSortKey {
                key: self.key.clone(),
            })
        }
    }

    pub fn compare<T: Queryable>(&self, a: &T, b: &T) -> Ordering {
        let ordering = a.field(&self.key).cmp(&b.field(&self.key));
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}
