//! Row filters understood by the Stackby content API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Missing value for operator: {0}")]
    MissingValue(FilterOperator),

    #[error("Missing column for operator: {0}")]
    MissingColumn(FilterOperator),
}

//
// ─── OPERATORS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    ToContains,
    DoesNotContain,
    Equal,
    NotEqual,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    IsExactly,
    IsAnyOf,
    FileName,
    FileType,
    /// Selects rows by id rather than by column value.
    #[serde(rename = "rowIds")]
    ById,
}

impl FilterOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::ToContains => "toContains",
            FilterOperator::DoesNotContain => "doesNotContain",
            FilterOperator::Equal => "equal",
            FilterOperator::NotEqual => "notEqual",
            FilterOperator::IsEmpty => "isEmpty",
            FilterOperator::IsNotEmpty => "isNotEmpty",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::GreaterThanEqual => "greaterThanEqual",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::LessThanEqual => "lessThanEqual",
            FilterOperator::IsExactly => "isExactly",
            FilterOperator::IsAnyOf => "isAnyOf",
            FilterOperator::FileName => "fileName",
            FilterOperator::FileType => "fileType",
            FilterOperator::ById => "rowIds",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "toContains" => Self::ToContains,
            "doesNotContain" => Self::DoesNotContain,
            "equal" => Self::Equal,
            "notEqual" => Self::NotEqual,
            "isEmpty" => Self::IsEmpty,
            "isNotEmpty" => Self::IsNotEmpty,
            "greaterThan" => Self::GreaterThan,
            "greaterThanEqual" => Self::GreaterThanEqual,
            "lessThan" => Self::LessThan,
            "lessThanEqual" => Self::LessThanEqual,
            "isExactly" => Self::IsExactly,
            "isAnyOf" => Self::IsAnyOf,
            "fileName" => Self::FileName,
            "fileType" => Self::FileType,
            "rowIds" => Self::ById,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        };
        Ok(op)
    }
}

//
// ─── FILTERS ───────────────────────────────────────────────────────────────────
//

/// Filter value as sent by callers; numbers are rendered verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A single content filter.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentFilter {
    /// `operator(column, value)`; `rowIds` is not a valid standard operator.
    Standard {
        operator: FilterOperator,
        column: String,
        value: Option<FilterValue>,
    },
    /// Select rows by id.
    ById(String),
}

impl ContentFilter {
    /// Builds a filter from loosely typed request parameters.
    ///
    /// Returns `Ok(None)` when no operator is given.
    ///
    /// # Errors
    ///
    /// - `FilterError::UnsupportedOperator` for an unknown operator name.
    /// - `FilterError::MissingValue` for `rowIds` without a value.
    /// - `FilterError::MissingColumn` for any other operator without a column.
    pub fn from_params(
        operator: Option<&str>,
        column: Option<&str>,
        value: Option<FilterValue>,
    ) -> Result<Option<Self>, FilterError> {
        let Some(operator) = operator.filter(|op| !op.is_empty()) else {
            return Ok(None);
        };
        let operator: FilterOperator = operator.parse()?;

        if operator == FilterOperator::ById {
            let value = value
                .map(|v| v.to_string())
                .filter(|v| !v.is_empty())
                .ok_or(FilterError::MissingValue(operator))?;
            return Ok(Some(Self::ById(value)));
        }

        let column = column
            .filter(|c| !c.is_empty())
            .ok_or(FilterError::MissingColumn(operator))?;

        Ok(Some(Self::Standard {
            operator,
            column: column.to_string(),
            value,
        }))
    }

    #[must_use]
    pub fn operator(&self) -> FilterOperator {
        match self {
            ContentFilter::Standard { operator, .. } => *operator,
            ContentFilter::ById(_) => FilterOperator::ById,
        }
    }

    /// Query-string fragment appended to the upstream request.
    #[must_use]
    pub fn query_fragment(&self) -> String {
        match self {
            ContentFilter::Standard {
                operator,
                column,
                value,
            } => format!("filter={operator}({{{column}}},{})", render_value(value.as_ref())),
            ContentFilter::ById(id) => format!("{}[]={id}", FilterOperator::ById),
        }
    }

    /// Short string distinguishing this filter inside a cache key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            ContentFilter::Standard {
                operator,
                column,
                value,
            } => format!("{operator}-{column}-{}", render_value(value.as_ref())),
            ContentFilter::ById(id) => id.clone(),
        }
    }
}

// A missing value renders as `undefined`, which is what the upstream API has
// always received for value-less operators such as `isEmpty`.
fn render_value(value: Option<&FilterValue>) -> String {
    value.map_or_else(|| "undefined".to_string(), ToString::to_string)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
