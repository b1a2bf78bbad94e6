//! Ingredient filter expressions.
//!
//! An expression is a list of ingredient tokens, each optionally prefixed:
//! - `@garlic`: recipe must contain garlic
//! - `!beef`: recipe must not contain beef
//! - `|rice |noodles`: recipe must contain at least one of these
//! - `garlic`: same as `@garlic`
//!
//! Example: "@chicken !beef |rice |noodles"

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::sql::Predicate;

/// Which set a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    MustHave,
    MustNotHave,
    AnyOf,
}

impl FilterKind {
    /// Label used in conflict messages.
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::MustHave => "AND (@)",
            FilterKind::MustNotHave => "NOT (!)",
            FilterKind::AnyOf => "OR (|)",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error(
        "Invalid query: Ingredient(s) {} cannot be in both {first} and {second} conditions.",
        .names.join(", ")
    )]
    Conflict {
        names: Vec<String>,
        first: FilterKind,
        second: FilterKind,
    },

    #[error("At least one ingredient condition is required.")]
    Empty,
}

/// Parsed ingredient filter, split by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientFilter {
    pub must_have: Vec<String>,
    pub must_not_have: Vec<String>,
    pub any_of: Vec<String>,
}

impl IngredientFilter {
    /// Parse a whitespace-separated token expression.
    pub fn parse(expression: &str) -> Self {
        let mut filter = Self::default();
        for token in expression.split_whitespace() {
            filter.push_token(token);
        }
        filter
    }

    /// Build from comma-separated lists, as sent by the include/exclude/anyOf
    /// query parameters. Entries carry no prefix; the list decides the category.
    pub fn from_lists(include: Option<&str>, exclude: Option<&str>, any_of: Option<&str>) -> Self {
        Self {
            must_have: split_list(include),
            must_not_have: split_list(exclude),
            any_of: split_list(any_of),
        }
    }

    fn push_token(&mut self, token: &str) {
        let token = token.trim();
        let (kind, name) = if let Some(rest) = token.strip_prefix('@') {
            (FilterKind::MustHave, rest)
        } else if let Some(rest) = token.strip_prefix('!') {
            (FilterKind::MustNotHave, rest)
        } else if let Some(rest) = token.strip_prefix('|') {
            (FilterKind::AnyOf, rest)
        } else {
            (FilterKind::MustHave, token)
        };

        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let target = match kind {
            FilterKind::MustHave => &mut self.must_have,
            FilterKind::MustNotHave => &mut self.must_not_have,
            FilterKind::AnyOf => &mut self.any_of,
        };
        target.push(name.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.must_have.is_empty() && self.must_not_have.is_empty() && self.any_of.is_empty()
    }

    /// Reject filters that can never match.
    ///
    /// An ingredient may not be both required and excluded, nor both excluded
    /// and one of the alternatives. Required and alternative together is fine:
    /// "must contain X and at least one of {..}".
    pub fn validate(&self) -> Result<(), FilterError> {
        let checks = [
            (
                &self.must_have,
                FilterKind::MustHave,
                &self.must_not_have,
                FilterKind::MustNotHave,
            ),
            (
                &self.must_not_have,
                FilterKind::MustNotHave,
                &self.any_of,
                FilterKind::AnyOf,
            ),
        ];

        for (left, first, right, second) in checks {
            let names = overlap(left, right);
            if !names.is_empty() {
                return Err(FilterError::Conflict {
                    names,
                    first,
                    second,
                });
            }
        }
        Ok(())
    }

    /// Compile to a predicate over `column`. None for an empty filter.
    ///
    /// Does not validate; call [`IngredientFilter::validate`] first.
    pub fn to_predicate(&self, column: &str) -> Option<Predicate> {
        let must_have = Predicate::all(self.must_have.iter().map(|i| Predicate::contains(column, i)));
        let must_not_have = Predicate::all(
            self.must_not_have
                .iter()
                .map(|i| Predicate::not_contains(column, i)),
        );
        let any_of = Predicate::any(self.any_of.iter().map(|i| Predicate::contains(column, i)));

        Predicate::all([must_have, must_not_have, any_of].into_iter().flatten())
    }

    /// Validate and compile in one step; an empty filter is an error.
    pub fn compile(&self, column: &str) -> Result<Predicate, FilterError> {
        self.validate()?;
        self.to_predicate(column).ok_or(FilterError::Empty)
    }
}

/// Parse and compile a token expression against `column`.
pub fn compile(expression: &str, column: &str) -> Result<Predicate, FilterError> {
    IngredientFilter::parse(expression).compile(column)
}

fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Names from `left` that also appear in `right`, compared case-insensitively.
fn overlap(left: &[String], right: &[String]) -> Vec<String> {
    let right: HashSet<String> = right.iter().map(|s| s.to_lowercase()).collect();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            right.contains(&lower) && seen.insert(lower)
        })
        .cloned()
        .collect()
}
