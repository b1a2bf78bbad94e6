//! SQL text building for the query engine.
//!
//! # Safety
//!
//! The engine only accepts query text, so user input is embedded as literals.
//! Every user-supplied value MUST go through one of:
//! - [`escape_literal`] / [`quote_literal`] for exact text
//! - [`contains_pattern`] for substring matches (used with [`LIKE_ESCAPE`])
//! - numeric values formatted from parsed `f64` / `i64`, never raw strings
//!
//! Identifiers come from [`tables`] / [`columns`] or configuration, not from
//! requests.

use std::fmt;

/// Escape character clause appended to every `LIKE` built by [`contains_pattern`].
pub const LIKE_ESCAPE: &str = r"ESCAPE '\'";

/// Default table names in the reference dataset.
pub mod tables {
    pub const RECIPES: &str = "cutoff10_recipes_veg_non_veg_sm";
    pub const INGREDIENTS: &str = "ingredient_details_server";
    pub const MAPPED_FOOTPRINTS: &str = "recipedb_mapped_ing_cf_count";
}

/// Column names, already quoted where the dataset uses spaces or mixed case.
pub mod columns {
    pub const RECIPE_ID: &str = r#""Recipe ID""#;
    pub const RECIPE_NAME: &str = r#""Recipe Name""#;
    pub const RECIPE_INGREDIENT: &str = r#""Recipe Ingredient""#;
    pub const CARBON_FOOTPRINT_SUM: &str = "Carbon_footprint_sum";
    pub const VEGETARIAN: &str = "Vegetarian_Recipe";
    pub const REGION: &str = "region";
    pub const COOK_TIME: &str = "cook_time";

    pub const INGREDIENT_NAME: &str = r#""RecipeDB Ingredient""#;
    pub const CARBON_FOOTPRINT: &str = r#""Carbon Footprint""#;

    pub const MAPPED_INGREDIENT: &str = r#""Sueatable Ingredient""#;
    pub const MAPPED_FOOTPRINT: &str = r#""CF""#;

    /// Recipe projection returned by the paginated recipe endpoints.
    pub const RECIPE_LISTING: &[&str] = &[
        r#""Recipe ID""#,
        r#""Recipe Name""#,
        r#""Recipe Ingredient""#,
        r#""Total Ingredient""#,
        r#""Available Ingredients""#,
        r#""Available Count""#,
        r#""Not Available Ingredients""#,
        r#""Not Available Count""#,
        r#""Available Percentage""#,
        "Carbon_footprint_sum",
        "Vegetarian_Recipe",
        "Non_Vegetarian_Recipe",
        "Miscellaneous_Recipe",
        "continent",
        "region",
        "sub_region",
        "instructions",
        "ingredient_phrase",
    ];

    /// Ingredient projection returned by the ingredient range endpoint.
    pub const INGREDIENT_LISTING: &[&str] = &[
        r#""RecipeDB Ingredient""#,
        r#""Category""#,
        r#""Sueatable_Ingredient""#,
        r#""Food_Commodity_Group""#,
        r#""Food_Commodity_Typology""#,
        r#""Region""#,
        r#""Country""#,
        r#""Carbon Footprint""#,
        r#""Full Reference""#,
        r#""Publication Year""#,
        r#""Source Type""#,
    ];
}

/// Double single quotes so the text can sit inside a `'...'` literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// `'value'` with quotes escaped.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Lower-cased `'%value%'` literal with `LIKE` wildcards escaped.
///
/// Must be used with `LOWER(column) LIKE ... ESCAPE '\'` so `%`, `_` and `\`
/// in the value match literally.
pub fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.to_lowercase().chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\'' => escaped.push_str("''"),
            _ => escaped.push(c),
        }
    }
    format!("'%{}%'", escaped)
}

/// Scientific notation, which the engine reads as DOUBLE.
///
/// Plain decimal output of very large or very small values exceeds the
/// engine's 38-digit DECIMAL literal limit.
pub fn double_literal(value: f64) -> String {
    format!("{:e}", value)
}

/// A boolean SQL fragment, safe to place after `WHERE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(String);

impl Predicate {
    /// Wrap an already-safe fragment. Callers are responsible for escaping.
    pub fn raw(sql: impl Into<String>) -> Self {
        Predicate(sql.into())
    }

    /// Case-insensitive substring test: `LOWER(column) LIKE '%value%'`.
    pub fn contains(column: &str, value: &str) -> Self {
        Predicate(format!(
            "LOWER({}) LIKE {} {}",
            column,
            contains_pattern(value),
            LIKE_ESCAPE
        ))
    }

    /// Negated substring test: `LOWER(column) NOT LIKE '%value%'`.
    pub fn not_contains(column: &str, value: &str) -> Self {
        Predicate(format!(
            "LOWER({}) NOT LIKE {} {}",
            column,
            contains_pattern(value),
            LIKE_ESCAPE
        ))
    }

    /// Case-insensitive equality.
    pub fn equals_ignore_case(column: &str, value: &str) -> Self {
        Predicate(format!(
            "LOWER({}) = {}",
            column,
            quote_literal(&value.to_lowercase())
        ))
    }

    /// `column >= value`; the column is cast so text-typed columns compare numerically.
    pub fn at_least(column: &str, value: f64) -> Self {
        Predicate(format!(
            "TRY_CAST({} AS DOUBLE) >= {}",
            column,
            double_literal(value)
        ))
    }

    /// `column <= value`, cast as for [`Predicate::at_least`].
    pub fn at_most(column: &str, value: f64) -> Self {
        Predicate(format!(
            "TRY_CAST({} AS DOUBLE) <= {}",
            column,
            double_literal(value)
        ))
    }

    /// Conjunction of the given fragments. None when there are none.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        Self::join(parts, " AND ")
    }

    /// Disjunction of the given fragments. None when there are none.
    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        Self::join(parts, " OR ")
    }

    fn join(parts: impl IntoIterator<Item = Predicate>, op: &str) -> Option<Predicate> {
        let parts: Vec<String> = parts.into_iter().map(|p| p.0).collect();
        match parts.len() {
            0 => None,
            1 => parts.into_iter().next().map(Predicate),
            _ => Some(Predicate(format!("({})", parts.join(op)))),
        }
    }

    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ` WHERE <predicate>` or nothing.
pub fn where_clause(predicate: Option<&Predicate>) -> String {
    predicate
        .map(|p| format!(" WHERE {}", p))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_literal_doubles_quotes() {
        assert_eq!(escape_literal("o'brien"), "o''brien");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Chicken"), "'%chicken%'");
        assert_eq!(contains_pattern("100%"), r"'%100\%%'");
        assert_eq!(contains_pattern("a_b"), r"'%a\_b%'");
        assert_eq!(contains_pattern(r"a\b"), r"'%a\\b%'");
        assert_eq!(contains_pattern("O'Brien"), "'%o''brien%'");
    }

    #[test]
    fn test_contains_predicate() {
        let p = Predicate::contains(columns::RECIPE_INGREDIENT, "Garlic");
        assert_eq!(
            p.as_sql(),
            r#"LOWER("Recipe Ingredient") LIKE '%garlic%' ESCAPE '\'"#
        );
    }

    #[test]
    fn test_join_parenthesizes_multiple_parts() {
        assert_eq!(Predicate::all(Vec::new()), None);
        assert_eq!(
            Predicate::all([Predicate::raw("a = 1")]).unwrap().as_sql(),
            "a = 1"
        );
        assert_eq!(
            Predicate::any([Predicate::raw("a = 1"), Predicate::raw("b = 2")])
                .unwrap()
                .as_sql(),
            "(a = 1 OR b = 2)"
        );
    }

    #[test]
    fn test_range_predicates_format_numbers() {
        assert_eq!(
            Predicate::at_least(columns::CARBON_FOOTPRINT, 1.5).as_sql(),
            r#"TRY_CAST("Carbon Footprint" AS DOUBLE) >= 1.5e0"#
        );
        assert_eq!(
            Predicate::at_most(columns::CARBON_FOOTPRINT_SUM, 10.0).as_sql(),
            "TRY_CAST(Carbon_footprint_sum AS DOUBLE) <= 1e1"
        );
    }

    #[test]
    fn test_extreme_bounds_stay_short() {
        assert_eq!(
            Predicate::at_least("cf", 1e300).as_sql(),
            "TRY_CAST(cf AS DOUBLE) >= 1e300"
        );
        assert_eq!(
            Predicate::at_most("cf", 1e-300).as_sql(),
            "TRY_CAST(cf AS DOUBLE) <= 1e-300"
        );
        assert_eq!(double_literal(-0.25), "-2.5e-1");
        assert_eq!(double_literal(0.0), "0e0");
    }

    #[test]
    fn test_where_clause() {
        assert_eq!(where_clause(None), "");
        assert_eq!(
            where_clause(Some(&Predicate::raw("x = 1"))),
            " WHERE x = 1"
        );
    }
}
