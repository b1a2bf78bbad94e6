//! Carbon footprint lookups for ingredients and whole recipes.
//!
//! Each ingredient is looked up in the ingredient details table first, then
//! in the mapped footprint table. A failed lookup marks that one ingredient as
//! unavailable instead of failing the recipe.

use futures::stream::{self, StreamExt};
use serde::ser::{Serialize, Serializer};
use thiserror::Error;

use crate::client::QueryClient;
use crate::error::QueryError;
use crate::result::Row;
use crate::sql::{columns, tables, Predicate};

/// Marker serialized in place of a footprint we could not resolve.
pub const UNAVAILABLE: &str = "Data not available";

// Result headers come back unquoted
const INGREDIENT_HEADER: &str = "RecipeDB Ingredient";
const FOOTPRINT_HEADER: &str = "Carbon Footprint";
const MAPPED_INGREDIENT_HEADER: &str = "Sueatable Ingredient";
const MAPPED_FOOTPRINT_HEADER: &str = "CF";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FootprintError {
    #[error("Invalid Recipe Ingredient format")]
    MalformedIngredientList,

    #[error("No ingredients found in the recipe")]
    EmptyIngredientList,
}

/// A resolved footprint in kg CO2e per kg, or the unavailable marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Footprint {
    Known(f64),
    Unavailable,
}

impl Footprint {
    pub fn value(&self) -> Option<f64> {
        match self {
            Footprint::Known(v) => Some(*v),
            Footprint::Unavailable => None,
        }
    }
}

impl Serialize for Footprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Footprint::Known(v) => serializer.serialize_f64(*v),
            Footprint::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientFootprint {
    /// Matched reference name, or the recipe's own text when nothing matched.
    pub ingredient: String,
    pub carbon_footprint: Footprint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintBreakdown {
    pub items: Vec<IngredientFootprint>,
    /// Sum over resolved items only.
    pub total: f64,
}

/// A single reference-table match.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientMatch {
    pub ingredient: String,
    pub footprint_per_kg: f64,
}

/// Reference tables used for lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintTables {
    /// Ingredient details, keyed by "RecipeDB Ingredient".
    pub ingredients: String,
    /// Fallback mapping, keyed by "Sueatable Ingredient".
    pub mapped: String,
}

impl Default for FootprintTables {
    fn default() -> Self {
        Self {
            ingredients: tables::INGREDIENTS.to_string(),
            mapped: tables::MAPPED_FOOTPRINTS.to_string(),
        }
    }
}

/// Parse a stored ingredient list.
///
/// The dataset stores Python-style lists (`['salt', 'pepper']`). Strict JSON
/// is tried first so names containing apostrophes survive when the data is
/// clean; otherwise single quotes are swapped for double quotes.
pub fn parse_ingredient_list(raw: &str) -> Result<Vec<String>, FootprintError> {
    let parsed: Vec<String> = serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&raw.replace('\'', "\"")))
        .map_err(|_| FootprintError::MalformedIngredientList)?;

    if parsed.is_empty() {
        return Err(FootprintError::EmptyIngredientList);
    }
    Ok(parsed)
}

pub fn primary_lookup_sql(table: &str, ingredient: &str) -> String {
    format!(
        "SELECT {}, {} FROM {} WHERE {} LIMIT 1",
        columns::INGREDIENT_NAME,
        columns::CARBON_FOOTPRINT,
        table,
        Predicate::contains(columns::INGREDIENT_NAME, ingredient)
    )
}

/// The mapped table stores alternatives joined by `|`, so the ingredient's
/// words are joined the same way before matching.
pub fn fallback_lookup_sql(table: &str, ingredient: &str) -> String {
    let joined = ingredient.split_whitespace().collect::<Vec<_>>().join("|");
    format!(
        "SELECT {}, {} FROM {} WHERE {} LIMIT 1",
        columns::MAPPED_INGREDIENT,
        columns::MAPPED_FOOTPRINT,
        table,
        Predicate::contains(columns::MAPPED_INGREDIENT, &joined)
    )
}

/// Resolves ingredient footprints through the query client.
#[derive(Debug, Clone)]
pub struct FootprintAggregator {
    client: QueryClient,
    tables: FootprintTables,
    concurrency: usize,
}

impl FootprintAggregator {
    /// `concurrency` bounds in-flight lookups per recipe; 1 looks up one at a time.
    pub fn new(client: QueryClient, tables: FootprintTables, concurrency: usize) -> Self {
        Self {
            client,
            tables,
            concurrency: concurrency.max(1),
        }
    }

    /// Look up one ingredient in the details table only.
    pub async fn lookup_ingredient(
        &self,
        ingredient: &str,
    ) -> Result<Option<IngredientMatch>, QueryError> {
        let result = self
            .client
            .execute(&primary_lookup_sql(&self.tables.ingredients, ingredient))
            .await?;

        result
            .first()
            .map(|row| read_match(row, INGREDIENT_HEADER, FOOTPRINT_HEADER, ingredient))
            .transpose()
    }

    async fn lookup_mapped(&self, ingredient: &str) -> Result<Option<IngredientMatch>, QueryError> {
        let result = self
            .client
            .execute(&fallback_lookup_sql(&self.tables.mapped, ingredient))
            .await?;

        result
            .first()
            .map(|row| {
                read_match(
                    row,
                    MAPPED_INGREDIENT_HEADER,
                    MAPPED_FOOTPRINT_HEADER,
                    ingredient,
                )
            })
            .transpose()
    }

    async fn resolve(&self, ingredient: &str) -> IngredientFootprint {
        let found = match self.lookup_ingredient(ingredient).await {
            Ok(Some(found)) => Ok(Some(found)),
            Ok(None) => self.lookup_mapped(ingredient).await,
            Err(e) => Err(e),
        };

        match found {
            Ok(Some(found)) => IngredientFootprint {
                ingredient: found.ingredient,
                carbon_footprint: Footprint::Known(found.footprint_per_kg),
            },
            Ok(None) => {
                tracing::debug!(ingredient, "no footprint data");
                unavailable(ingredient)
            }
            Err(e) => {
                tracing::warn!(ingredient, error = %e, "footprint lookup failed");
                unavailable(ingredient)
            }
        }
    }

    /// Itemize and sum the footprint of a stored ingredient list.
    ///
    /// Items keep the input order. Lookup failures only affect their own item.
    pub async fn aggregate(&self, raw_list: &str) -> Result<FootprintBreakdown, FootprintError> {
        let ingredients = parse_ingredient_list(raw_list)?;

        let lookups: Vec<_> = ingredients
            .iter()
            .map(|ingredient| self.resolve(ingredient))
            .collect();
        let items: Vec<IngredientFootprint> = stream::iter(lookups)
            .buffered(self.concurrency)
            .collect()
            .await;

        let total = items
            .iter()
            .filter_map(|item| item.carbon_footprint.value())
            .sum();

        Ok(FootprintBreakdown { items, total })
    }
}

fn unavailable(ingredient: &str) -> IngredientFootprint {
    IngredientFootprint {
        ingredient: ingredient.to_string(),
        carbon_footprint: Footprint::Unavailable,
    }
}

fn read_match(
    row: &Row,
    name_column: &str,
    footprint_column: &str,
    fallback_name: &str,
) -> Result<IngredientMatch, QueryError> {
    Ok(IngredientMatch {
        ingredient: row.get(name_column).unwrap_or(fallback_name).to_string(),
        footprint_per_kg: row.parse_f64(footprint_column)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PollPolicy;
    use crate::engine::{FakeEngine, FakeOutcome, QueryContext};
    use std::sync::Arc;
    use std::time::Duration;

    fn primary(name: &str) -> String {
        format!(
            "from ingredient_details_server where lower(\"recipedb ingredient\") like '%{}%'",
            name
        )
    }

    fn fallback(name: &str) -> String {
        format!(
            "from recipedb_mapped_ing_cf_count where lower(\"sueatable ingredient\") like '%{}%'",
            name
        )
    }

    fn engine() -> FakeEngine {
        FakeEngine::new().with_default_outcome(FakeOutcome::empty(&["name", "cf"]))
    }

    fn aggregator(engine: Arc<FakeEngine>, concurrency: usize) -> FootprintAggregator {
        let client = QueryClient::new(
            engine,
            QueryContext {
                database: "recipes".to_string(),
                output_location: None,
                workgroup: "primary".to_string(),
            },
            PollPolicy {
                interval: Duration::from_millis(1),
                max_wait: Duration::from_secs(5),
            },
        );
        FootprintAggregator::new(client, FootprintTables::default(), concurrency)
    }

    fn details(name: &str, cf: &str) -> FakeOutcome {
        FakeOutcome::table(&[INGREDIENT_HEADER, FOOTPRINT_HEADER], &[&[name, cf]])
    }

    #[test]
    fn test_parse_ingredient_list() {
        assert_eq!(
            parse_ingredient_list(r#"["tomato","garlic"]"#).unwrap(),
            vec!["tomato", "garlic"]
        );
        assert_eq!(
            parse_ingredient_list("['sea salt', 'black pepper']").unwrap(),
            vec!["sea salt", "black pepper"]
        );
        assert_eq!(
            parse_ingredient_list(r#"["baker's yeast"]"#).unwrap(),
            vec!["baker's yeast"]
        );
    }

    #[test]
    fn test_parse_ingredient_list_errors() {
        assert_eq!(
            parse_ingredient_list("[]"),
            Err(FootprintError::EmptyIngredientList)
        );
        assert_eq!(
            parse_ingredient_list("{malformed json}"),
            Err(FootprintError::MalformedIngredientList)
        );
        assert_eq!(
            parse_ingredient_list(r#"{"a": 1}"#),
            Err(FootprintError::MalformedIngredientList)
        );
    }

    #[test]
    fn test_fallback_sql_joins_words_with_pipe() {
        let sql = fallback_lookup_sql(tables::MAPPED_FOOTPRINTS, "Sea  Salt");
        assert!(sql.contains(r#"LOWER("Sueatable Ingredient") LIKE '%sea|salt%'"#));
        assert!(sql.ends_with("LIMIT 1"));
    }

    #[test]
    fn test_footprint_serialization() {
        let items = vec![
            IngredientFootprint {
                ingredient: "tomato".to_string(),
                carbon_footprint: Footprint::Known(1.5),
            },
            unavailable("unobtainium"),
        ];
        assert_eq!(
            serde_json::to_value(&items).unwrap(),
            serde_json::json!([
                {"ingredient": "tomato", "carbonFootprint": 1.5},
                {"ingredient": "unobtainium", "carbonFootprint": "Data not available"}
            ])
        );
    }

    #[tokio::test]
    async fn test_aggregate_sums_found_footprints() {
        let engine = Arc::new(
            engine()
                .with_outcome(&primary("tomato"), details("tomato", "1.5"))
                .with_outcome(&primary("garlic"), details("garlic", "0.5")),
        );
        let aggregator = aggregator(engine, 1);

        let breakdown = aggregator.aggregate(r#"["tomato","garlic"]"#).await.unwrap();

        assert_eq!(breakdown.items.len(), 2);
        assert_eq!(breakdown.total, 2.0);
        assert_eq!(breakdown.items[1].ingredient, "garlic");
    }

    #[tokio::test]
    async fn test_aggregate_uses_fallback_table() {
        let engine = Arc::new(engine().with_outcome(
            &fallback("sea|salt"),
            FakeOutcome::table(
                &[MAPPED_INGREDIENT_HEADER, MAPPED_FOOTPRINT_HEADER],
                &[&["sea|salt", "0.2"]],
            ),
        ));
        let aggregator = aggregator(engine.clone(), 1);

        let breakdown = aggregator.aggregate("['sea salt']").await.unwrap();

        assert_eq!(
            breakdown.items[0].carbon_footprint,
            Footprint::Known(0.2)
        );
        assert_eq!(breakdown.total, 0.2);
        assert_eq!(engine.submitted_queries().len(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_tolerates_failed_lookups() {
        let engine = Arc::new(
            engine()
                .with_outcome(&primary("tomato"), details("tomato", "1.5"))
                .with_outcome(
                    &primary("saffron"),
                    FakeOutcome::Unreachable("connection reset".to_string()),
                )
                .with_outcome(&primary("basil"), details("basil", "not a number")),
        );
        let aggregator = aggregator(engine, 1);

        let breakdown = aggregator
            .aggregate(r#"["tomato","saffron","basil","unobtainium"]"#)
            .await
            .unwrap();

        let footprints: Vec<Footprint> = breakdown
            .items
            .iter()
            .map(|i| i.carbon_footprint)
            .collect();
        assert_eq!(
            footprints,
            vec![
                Footprint::Known(1.5),
                Footprint::Unavailable,
                Footprint::Unavailable,
                Footprint::Unavailable,
            ]
        );
        assert_eq!(breakdown.items[1].ingredient, "saffron");
        assert_eq!(breakdown.total, 1.5);
    }

    #[tokio::test]
    async fn test_aggregate_concurrent_lookups_keep_order() {
        let names = ["a1", "b2", "c3", "d4", "e5"];
        let mut engine = engine();
        for (i, name) in names.iter().enumerate() {
            engine = engine.with_outcome(&primary(name), details(name, &format!("{}", i + 1)));
        }
        let aggregator = aggregator(Arc::new(engine), 3);

        let breakdown = aggregator
            .aggregate(r#"["a1","b2","c3","d4","e5"]"#)
            .await
            .unwrap();

        let order: Vec<&str> = breakdown
            .items
            .iter()
            .map(|i| i.ingredient.as_str())
            .collect();
        assert_eq!(order, names);
        assert_eq!(breakdown.total, 15.0);
    }

    #[tokio::test]
    async fn test_lookup_ingredient() {
        let engine = Arc::new(engine().with_outcome(&primary("tomato"), details("Tomato", "1.5")));
        let aggregator = aggregator(engine, 1);

        let found = aggregator.lookup_ingredient("tomato").await.unwrap();
        assert_eq!(
            found,
            Some(IngredientMatch {
                ingredient: "Tomato".to_string(),
                footprint_per_kg: 1.5,
            })
        );
        assert_eq!(aggregator.lookup_ingredient("kale").await.unwrap(), None);
    }
}
