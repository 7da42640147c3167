//! Tabular view of a prediction payload
//!
//! Accepts the JSON layouts clients send:
//!
//! - **records**: `[{"cap-shape": "x", "stem-width": 5}, ...]`
//! - **columns**: `{"cap-shape": ["x", "b"], "stem-width": [5, 3]}`
//! - **keyed columns**: `{"cap-shape": {"0": "x", "1": "b"}, ...}`, the
//!   layout of a dataframe's default `to_json()`
//!
//! Both produce the same [`Frame`]: named columns of [`RawValue`] cells,
//! all of equal length, in first-appearance column order.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::error::EncodingError;

/// A single cell as it arrived in the payload
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    fn from_json(column: &str, value: &Value) -> Result<Self, EncodingError> {
        match value {
            Value::Null => Ok(RawValue::Null),
            Value::Bool(b) => Ok(RawValue::Bool(*b)),
            Value::Number(n) => Ok(n.as_f64().map_or(RawValue::Null, RawValue::Number)),
            Value::String(s) => Ok(RawValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(EncodingError::NestedValue {
                column: column.to_string(),
            }),
        }
    }

    /// Whether the cell is absent
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Numeric coercion; `None` when the cell has no numeric reading
    pub fn to_number(&self) -> Option<f64> {
        let n = match self {
            RawValue::Null => return None,
            RawValue::Bool(b) => f64::from(u8::from(*b)),
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Text form used for code-table lookups
    pub fn label(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Text(s) => Some(s.clone()),
        }
    }
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<RawValue>,
}

impl Column {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }
}

/// Row/column addressable table built from a payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Frame {
    /// Parse a request body and build a frame from it
    pub fn from_slice(body: &[u8]) -> Result<Self, EncodingError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_json(&value)
    }

    /// Build a frame from an already-parsed payload
    pub fn from_json(value: &Value) -> Result<Self, EncodingError> {
        match value {
            Value::Array(records) => Self::from_records(records),
            Value::Object(columns) => Self::from_columns(columns),
            other => Err(EncodingError::NotTabular(json_kind(other))),
        }
    }

    fn from_records(records: &[Value]) -> Result<Self, EncodingError> {
        let mut columns: Vec<Column> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let fields = record.as_object().ok_or(EncodingError::NonObjectRecord {
                index,
                kind: json_kind(record),
            })?;

            for (name, value) in fields {
                let position = match positions.get(name) {
                    Some(&p) => p,
                    None => {
                        let mut column = Column::new(name.as_str());
                        column.values.resize(index, RawValue::Null);
                        columns.push(column);
                        positions.insert(name.clone(), columns.len() - 1);
                        columns.len() - 1
                    }
                };
                columns[position]
                    .values
                    .push(RawValue::from_json(name, value)?);
            }

            // Keys this record did not carry
            for column in &mut columns {
                column.values.resize(index + 1, RawValue::Null);
            }
        }

        Ok(Self {
            columns,
            num_rows: records.len(),
        })
    }

    fn from_columns(fields: &Map<String, Value>) -> Result<Self, EncodingError> {
        let has_keyed = fields.values().any(Value::is_object);
        if has_keyed && fields.values().any(Value::is_array) {
            return Err(EncodingError::MixedColumnLayouts);
        }
        if has_keyed {
            return Self::from_keyed_columns(fields);
        }

        let mut num_rows: Option<usize> = None;
        for (name, value) in fields {
            if let Value::Array(items) = value {
                match num_rows {
                    None => num_rows = Some(items.len()),
                    Some(expected) if expected != items.len() => {
                        return Err(EncodingError::RaggedColumns {
                            column: name.clone(),
                            expected,
                            actual: items.len(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let num_rows = match num_rows {
            Some(n) => n,
            None if fields.is_empty() => 0,
            None => return Err(EncodingError::ScalarColumnsOnly),
        };

        let mut columns = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let mut column = Column::new(name.as_str());
            match value {
                Value::Array(items) => {
                    for item in items {
                        column.values.push(RawValue::from_json(name, item)?);
                    }
                }
                scalar => {
                    let cell = RawValue::from_json(name, scalar)?;
                    column.values = vec![cell; num_rows];
                }
            }
            columns.push(column);
        }

        Ok(Self { columns, num_rows })
    }

    /// Columns of `{row-key: cell}`; rows are the union of keys in first-appearance order
    fn from_keyed_columns(fields: &Map<String, Value>) -> Result<Self, EncodingError> {
        let mut index: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for cells in fields.values().filter_map(Value::as_object) {
            for key in cells.keys() {
                if seen.insert(key.as_str()) {
                    index.push(key.as_str());
                }
            }
        }

        let mut columns = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let mut column = Column::new(name.as_str());
            match value {
                Value::Object(cells) => {
                    for key in &index {
                        let cell = match cells.get(*key) {
                            Some(cell) => RawValue::from_json(name, cell)?,
                            None => RawValue::Null,
                        };
                        column.values.push(cell);
                    }
                }
                scalar => {
                    let cell = RawValue::from_json(name, scalar)?;
                    column.values = vec![cell; index.len()];
                }
            }
            columns.push(column);
        }

        Ok(Self {
            columns,
            num_rows: index.len(),
        })
    }

    /// Number of records
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the frame holds no records
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// All columns in first-appearance order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a mutable column by name
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_fill_missing_keys() {
        let frame = Frame::from_json(&json!([
            {"cap-shape": "x"},
            {"stem-width": 3, "cap-shape": "b"},
        ]))
        .unwrap();

        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column_names(), vec!["cap-shape", "stem-width"]);
        assert_eq!(
            frame.column("stem-width").unwrap().values,
            vec![RawValue::Null, RawValue::Number(3.0)]
        );
    }

    #[test]
    fn test_columns_broadcast_scalars() {
        let frame = Frame::from_json(&json!({
            "cap-shape": ["x", "b", "f"],
            "season": "a",
        }))
        .unwrap();

        assert_eq!(frame.num_rows(), 3);
        assert_eq!(
            frame.column("season").unwrap().values,
            vec![RawValue::Text("a".into()); 3]
        );
    }

    #[test]
    fn test_records_and_columns_agree() {
        let records = Frame::from_json(&json!([
            {"cap-shape": "x", "stem-width": 5},
            {"cap-shape": "b", "stem-width": null},
        ]))
        .unwrap();
        let columns = Frame::from_json(&json!({
            "cap-shape": ["x", "b"],
            "stem-width": [5, null],
        }))
        .unwrap();
        assert_eq!(records, columns);
    }

    #[test]
    fn test_scalar_payload_rejected() {
        assert_eq!(
            Frame::from_json(&json!(42)),
            Err(EncodingError::NotTabular("a number"))
        );
        assert!(Frame::from_json(&json!("hello")).is_err());
        assert!(Frame::from_json(&Value::Null).is_err());
    }

    #[test]
    fn test_non_object_record_rejected() {
        let err = Frame::from_json(&json!([{"cap-shape": "x"}, 7])).unwrap_err();
        assert_eq!(
            err,
            EncodingError::NonObjectRecord {
                index: 1,
                kind: "a number"
            }
        );
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Frame::from_json(&json!({"a": [1, 2], "b": [1]})).unwrap_err();
        assert!(matches!(err, EncodingError::RaggedColumns { .. }));
    }

    #[test]
    fn test_keyed_columns_union_row_keys() {
        let frame = Frame::from_json(&json!({
            "stem-width": {"0": 5, "1": 3},
            "cap-shape": {"0": "x", "1": "b", "2": "f"},
            "season": "w",
        }))
        .unwrap();

        assert_eq!(frame.num_rows(), 3);
        assert_eq!(
            frame.column("stem-width").unwrap().values,
            vec![RawValue::Number(5.0), RawValue::Number(3.0), RawValue::Null]
        );
        assert_eq!(
            frame.column("cap-shape").unwrap().values,
            vec![
                RawValue::Text("x".into()),
                RawValue::Text("b".into()),
                RawValue::Text("f".into()),
            ]
        );
        assert_eq!(
            frame.column("season").unwrap().values,
            vec![RawValue::Text("w".into()); 3]
        );
    }

    #[test]
    fn test_keyed_columns_match_records() {
        let keyed = Frame::from_json(&json!({
            "cap-shape": {"0": "x", "1": "b"},
            "stem-width": {"0": 5, "1": null},
        }))
        .unwrap();
        let records = Frame::from_json(&json!([
            {"cap-shape": "x", "stem-width": 5},
            {"cap-shape": "b", "stem-width": null},
        ]))
        .unwrap();
        assert_eq!(keyed, records);
    }

    #[test]
    fn test_keyed_and_array_columns_rejected() {
        let err = Frame::from_json(&json!({"a": {"0": 1}, "b": [1]})).unwrap_err();
        assert_eq!(err, EncodingError::MixedColumnLayouts);
    }

    #[test]
    fn test_all_scalar_columns_rejected() {
        let err = Frame::from_json(&json!({"a": 1, "b": "x"})).unwrap_err();
        assert_eq!(err, EncodingError::ScalarColumnsOnly);
    }

    #[test]
    fn test_nested_value_rejected() {
        let err = Frame::from_json(&json!([{"cap-shape": ["x"]}])).unwrap_err();
        assert_eq!(
            err,
            EncodingError::NestedValue {
                column: "cap-shape".into()
            }
        );
    }

    #[test]
    fn test_invalid_json_body() {
        let err = Frame::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, EncodingError::InvalidJson(_)));
    }

    #[test]
    fn test_empty_payloads() {
        assert!(Frame::from_json(&json!([])).unwrap().is_empty());
        assert!(Frame::from_json(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(RawValue::Text(" 4.5 ".into()).to_number(), Some(4.5));
        assert_eq!(RawValue::Text("missing".into()).to_number(), None);
        assert_eq!(RawValue::Text("inf".into()).to_number(), None);
        assert_eq!(RawValue::Bool(true).to_number(), Some(1.0));
        assert_eq!(RawValue::Null.to_number(), None);
    }
}
