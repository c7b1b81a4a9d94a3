//! Record binding: coerced rows into caller record types through `serde`.
//!
//! Only schema fields are bound, empty cells are left out so the record keeps
//! its default, and a value the record type rejects is dropped on its own
//! rather than failing the whole row.

use log::debug;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    data::{CellValue, parse_float, parse_integer},
    schema::{FieldKind, RecordSchema},
    source::RawRow,
};

/// Record type for callers without a struct of their own.
pub type DynamicRecord = Map<String, Value>;

fn fit_value(value: &CellValue, kind: FieldKind) -> Value {
    match (kind, value) {
        (FieldKind::Integer, CellValue::Text(text)) => parse_integer(text)
            .map(Value::from)
            .unwrap_or_else(|| value.to_json()),
        (FieldKind::Float, CellValue::Text(text)) => parse_float(text)
            .map(Value::from)
            .unwrap_or_else(|| value.to_json()),
        (FieldKind::Float, CellValue::Integer(i)) => Value::from(*i as f64),
        _ => value.to_json(),
    }
}

/// The JSON object a row binds from.
pub fn row_object(row: &RawRow, schema: &RecordSchema) -> Map<String, Value> {
    schema
        .fields()
        .iter()
        .filter_map(|spec| {
            let value = row.get(&spec.name)?;
            if value.is_empty() {
                return None;
            }
            Some((spec.name.clone(), fit_value(value, spec.kind)))
        })
        .collect()
}

/// Binds one row. Never fails: fields that do not fit `T` keep their
/// default value.
pub fn bind_row<T>(row: &RawRow, schema: &RecordSchema) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    let object = row_object(row, schema);
    match serde_json::from_value::<T>(Value::Object(object.clone())) {
        Ok(record) => record,
        Err(err) => {
            debug!("Row {} binds leniently: {err}", row.index);
            bind_leniently(row.index, object)
        }
    }
}

fn bind_leniently<T>(index: usize, object: Map<String, Value>) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    let mut accepted = match serde_json::to_value(T::default()) {
        Ok(Value::Object(base)) => base,
        _ => return T::default(),
    };
    for (key, value) in object {
        let mut candidate = accepted.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            accepted = candidate;
        } else {
            debug!("Row {index} field '{key}' left at its default");
        }
    }
    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}
