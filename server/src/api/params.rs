//! Query-string parsing shared by several endpoints.
//!
//! Parameters arrive as raw strings so invalid values get our own messages
//! instead of the extractor's rejection text.

use foodprint_core::{PageRequest, Predicate};
use serde::Deserialize;
use utoipa::IntoParams;

use super::ApiError;

/// Trimmed value, or None when missing or blank.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Trimmed value, or a 400 with `message` when missing or blank.
pub fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    non_empty(value).ok_or_else(|| ApiError::bad_request(message))
}

pub fn page_request(page: Option<&str>, limit: Option<&str>) -> Result<PageRequest, ApiError> {
    Ok(PageRequest::parse(page, limit)?)
}

/// Recipe IDs are integers; anything else is rejected before querying.
pub fn recipe_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid Recipe ID"))
}

/// Finite number, or None for anything unparseable.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Query parameters of the carbon-footprint range endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FootprintRangeParams {
    /// Lower bound on the footprint (kg CO2e)
    pub min: Option<String>,
    /// Upper bound on the footprint (kg CO2e)
    pub max: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Inclusive carbon-footprint bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FootprintRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FootprintRange {
    /// Parse optional bounds. Both may be absent; use [`FootprintRange::require_bound`]
    /// where at least one is needed.
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self, ApiError> {
        let bound = |raw: Option<&str>| match non_empty(raw) {
            None => Ok(None),
            Some(v) => parse_number(v).map(Some).ok_or_else(|| {
                ApiError::bad_request(
                    "Invalid query parameters. Please provide valid numeric values for min and max.",
                )
            }),
        };
        let range = Self {
            min: bound(min)?,
            max: bound(max)?,
        };

        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(ApiError::bad_request(
                    "The min carbon footprint cannot be greater than the max carbon footprint.",
                ));
            }
        }
        Ok(range)
    }

    pub fn require_bound(self) -> Result<Self, ApiError> {
        if self.min.is_none() && self.max.is_none() {
            return Err(ApiError::bad_request(
                "At least one of min or max carbon footprint must be specified.",
            ));
        }
        Ok(self)
    }

    /// `min <= column <= max` over whichever bounds are set.
    pub fn to_predicate(&self, column: &str) -> Option<Predicate> {
        Predicate::all(
            [
                self.min.map(|v| Predicate::at_least(column, v)),
                self.max.map(|v| Predicate::at_most(column, v)),
            ]
            .into_iter()
            .flatten(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_parsing() {
        assert_eq!(
            FootprintRange::parse(Some("1.5"), None).unwrap(),
            FootprintRange {
                min: Some(1.5),
                max: None
            }
        );
        assert_eq!(
            FootprintRange::parse(Some(""), Some(" 3 ")).unwrap(),
            FootprintRange {
                min: None,
                max: Some(3.0)
            }
        );
    }

    #[test]
    fn test_range_errors() {
        let msg = |r: Result<FootprintRange, ApiError>| r.unwrap_err().to_string();

        assert_eq!(
            msg(FootprintRange::parse(Some("abc"), None)),
            "Invalid query parameters. Please provide valid numeric values for min and max."
        );
        assert_eq!(
            msg(FootprintRange::parse(Some("5"), Some("2"))),
            "The min carbon footprint cannot be greater than the max carbon footprint."
        );
        assert_eq!(
            msg(FootprintRange::parse(None, None).and_then(FootprintRange::require_bound)),
            "At least one of min or max carbon footprint must be specified."
        );
        assert!(FootprintRange::parse(Some("NaN"), None).is_err());
    }

    #[test]
    fn test_range_predicate() {
        let range = FootprintRange::parse(Some("1"), Some("2.5")).unwrap();
        assert_eq!(
            range.to_predicate("cf").unwrap().as_sql(),
            "(TRY_CAST(cf AS DOUBLE) >= 1e0 AND TRY_CAST(cf AS DOUBLE) <= 2.5e0)"
        );
        assert_eq!(FootprintRange::default().to_predicate("cf"), None);
    }

    #[test]
    fn test_recipe_id() {
        assert_eq!(recipe_id("42").unwrap(), 42);
        assert!(recipe_id("12abc").is_err());
        assert!(recipe_id("").is_err());
    }
}
