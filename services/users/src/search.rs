//! Multi-field user search
//!
//! A search names up to three text fields. Each supplied field becomes an
//! unanchored, ASCII case-insensitive substring condition and the
//! conditions are combined with AND. Needles are literal text.

use serde::{Deserialize, Serialize};

use crate::{
    error::{UserError, UserResult},
    models::{UserField, UserRecord},
};

/// Search request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl UserSearch {
    /// Human readable summary of the searched values
    pub fn describe(&self) -> String {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        format!(
            "first name '{}', last name '{}', username '{}'",
            value(&self.first_name),
            value(&self.last_name),
            value(&self.username)
        )
    }
}

/// One substring condition against a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field: UserField,
    pub needle: String,
}

impl FieldMatch {
    pub fn matches(&self, record: &UserRecord) -> bool {
        contains_ignore_ascii_case(record.field(self.field), &self.needle)
    }

    /// `LIKE` pattern matching the needle anywhere, with `\` as escape
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.needle.len() + 2);
        pattern.push('%');
        for c in self.needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// AND-combination of field conditions; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPredicate {
    conditions: Vec<FieldMatch>,
}

impl SearchPredicate {
    /// Build the predicate, rejecting a search with no criteria
    pub fn build(search: &UserSearch) -> UserResult<Self> {
        let conditions: Vec<FieldMatch> = [
            (UserField::FirstName, &search.first_name),
            (UserField::LastName, &search.last_name),
            (UserField::Username, &search.username),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|needle| !needle.is_empty())
                .map(|needle| FieldMatch {
                    field,
                    needle: needle.to_string(),
                })
        })
        .collect();

        if conditions.is_empty() {
            return Err(UserError::InvalidQuery(
                "At least one of firstName, lastName or username is required".to_string(),
            ));
        }

        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[FieldMatch] {
        &self.conditions
    }

    pub fn matches(&self, record: &UserRecord) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
