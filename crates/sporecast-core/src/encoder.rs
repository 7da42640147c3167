//! Feature encoding
//!
//! Turns a [`Frame`] into the dense `f32` matrix the booster scores:
//!
//! 1. nulls in the placeholder field become the `"missing"` token
//! 2. categorical fields are replaced by integer codes
//! 3. every cell is coerced to a number, failures become `0`
//! 4. columns are laid out in schema order, absent features stay zero
//!
//! Category codes come either from the batch itself ([`CategoryEncoding::PerBatch`])
//! or from a code table saved at training time ([`CategoryEncoding::Fixed`]).
//! Per-batch codes depend on which values happen to share a request, so the
//! same category can get different codes in different requests.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use serde::Deserialize;

use crate::error::{EncodingError, ModelError};
use crate::frame::{Column, Frame, RawValue};
use crate::schema::{FeatureSchema, MISSING_TOKEN};

/// Code given to nulls and to values a fixed table does not know
pub const UNKNOWN_CODE: i32 = -1;

/// Dense encoded batch, one row per record
pub type NumericMatrix = Array2<f32>;

/// Persisted category lists, one per categorical feature
///
/// The code of a value is its index in the feature's list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, Vec<String>>")]
pub struct CodeTable {
    codes: HashMap<String, HashMap<String, i32>>,
}

impl From<HashMap<String, Vec<String>>> for CodeTable {
    fn from(categories: HashMap<String, Vec<String>>) -> Self {
        let codes = categories
            .into_iter()
            .map(|(feature, values)| {
                let lookup = values
                    .into_iter()
                    .enumerate()
                    .map(|(code, value)| (value, code as i32))
                    .collect();
                (feature, lookup)
            })
            .collect();
        Self { codes }
    }
}

impl CodeTable {
    /// Parse a table from `{"feature": ["cat0", "cat1", ...], ...}`
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Whether the table has categories for a feature
    pub fn contains_feature(&self, feature: &str) -> bool {
        self.codes.contains_key(feature)
    }

    /// Code of `value` within `feature`
    pub fn code(&self, feature: &str, value: &str) -> Option<i32> {
        self.codes.get(feature)?.get(value).copied()
    }

    /// Number of features covered
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no feature is covered
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// How categorical values are numbered
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CategoryEncoding {
    /// Sort the distinct values in the batch and number them from 0
    #[default]
    PerBatch,
    /// Look codes up in a table saved with the model
    Fixed(CodeTable),
}

/// Encodes frames into model input
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    encoding: CategoryEncoding,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema, encoding: CategoryEncoding) -> Self {
        Self { schema, encoding }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encoding(&self) -> &CategoryEncoding {
        &self.encoding
    }

    /// Categorical features that fall back to per-batch codes
    pub fn uncovered_categoricals(&self) -> Vec<&str> {
        match &self.encoding {
            CategoryEncoding::PerBatch => {
                self.schema.categorical.iter().map(String::as_str).collect()
            }
            CategoryEncoding::Fixed(table) => self
                .schema
                .categorical
                .iter()
                .filter(|name| !table.contains_feature(name))
                .map(String::as_str)
                .collect(),
        }
    }

    /// Encode a frame into a `rows x schema features` matrix
    pub fn encode(&self, frame: &Frame) -> Result<NumericMatrix, EncodingError> {
        let mut matrix = NumericMatrix::zeros((frame.num_rows(), self.schema.num_features()));

        for column in frame.columns() {
            let Some(index) = self.schema.feature_index(&column.name) else {
                tracing::debug!(column = %column.name, "Ignoring column not used by the model");
                continue;
            };
            for (row, value) in self.encode_column(column).into_iter().enumerate() {
                matrix[[row, index]] = value;
            }
        }

        Ok(matrix)
    }

    fn encode_column(&self, column: &Column) -> Vec<f32> {
        let name = column.name.as_str();
        let cells = self.fill_placeholder(column);

        if self.schema.is_categorical(name) {
            let codes = match &self.encoding {
                CategoryEncoding::Fixed(table) if table.contains_feature(name) => cells
                    .iter()
                    .map(|cell| {
                        cell.label()
                            .and_then(|label| table.code(name, &label))
                            .unwrap_or(UNKNOWN_CODE)
                    })
                    .collect(),
                _ => batch_codes(&cells),
            };
            codes.into_iter().map(|code| code as f32).collect()
        } else {
            cells
                .iter()
                .map(|cell| cell.to_number().unwrap_or(0.0) as f32)
                .collect()
        }
    }

    fn fill_placeholder<'a>(&self, column: &'a Column) -> Cow<'a, [RawValue]> {
        let is_placeholder =
            self.schema.placeholder_feature.as_deref() == Some(column.name.as_str());
        if !is_placeholder || !column.values.iter().any(RawValue::is_null) {
            return Cow::Borrowed(&column.values);
        }
        Cow::Owned(
            column
                .values
                .iter()
                .map(|cell| match cell {
                    RawValue::Null => RawValue::Text(MISSING_TOKEN.to_string()),
                    other => other.clone(),
                })
                .collect(),
        )
    }
}

/// Number distinct non-null values in sorted order; nulls get [`UNKNOWN_CODE`]
fn batch_codes(cells: &[RawValue]) -> Vec<i32> {
    let mut distinct: Vec<&RawValue> = cells.iter().filter(|c| !c.is_null()).collect();
    distinct.sort_by(|a, b| category_order(a, b));
    distinct.dedup_by(|a, b| category_order(a, b) == Ordering::Equal);

    cells
        .iter()
        .map(|cell| {
            if cell.is_null() {
                return UNKNOWN_CODE;
            }
            distinct
                .binary_search_by(|probe| category_order(probe, cell))
                .map_or(UNKNOWN_CODE, |code| code as i32)
        })
        .collect()
}

/// Booleans, then numbers, then text; `-0.0` and `0.0` are one category
fn category_order(a: &RawValue, b: &RawValue) -> Ordering {
    fn rank(v: &RawValue) -> u8 {
        match v {
            RawValue::Bool(_) => 0,
            RawValue::Number(_) => 1,
            RawValue::Text(_) => 2,
            RawValue::Null => 3,
        }
    }

    match (a, b) {
        (RawValue::Bool(x), RawValue::Bool(y)) => x.cmp(y),
        (RawValue::Number(x), RawValue::Number(y)) => (x + 0.0).total_cmp(&(y + 0.0)),
        (RawValue::Text(x), RawValue::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
