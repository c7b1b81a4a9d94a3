//! Column alias resolution between spreadsheet headers and record fields.
//!
//! A [`ColumnMap`] is supplied by the caller as `header → field` pairs. The
//! engine uses it forwards to key raw rows by field name and backwards to
//! name the offending column in violation messages.

use std::collections::{BTreeMap, HashMap};

use crate::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pairs: Vec<(String, String)>,
    by_header: HashMap<String, usize>,
    by_field: HashMap<String, usize>,
}

impl ColumnMap {
    /// Builds a map from `(header, field)` pairs, rejecting ambiguous aliases
    /// in either direction.
    pub fn new<I, H, F>(pairs: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (H, F)>,
        H: Into<String>,
        F: Into<String>,
    {
        let mut map = ColumnMap::default();
        for (header, field) in pairs {
            let header = header.into();
            let field = field.into();
            if header.trim().is_empty() || field.trim().is_empty() {
                return Err(EngineError::schema(format!(
                    "Column alias '{header}' -> '{field}' must name both a header and a field"
                )));
            }
            if map.by_header.contains_key(&header) {
                return Err(EngineError::schema(format!(
                    "Header '{header}' is mapped more than once"
                )));
            }
            if let Some(&existing) = map.by_field.get(&field) {
                return Err(EngineError::schema(format!(
                    "Headers '{}' and '{header}' both map to field '{field}'",
                    map.pairs[existing].0
                )));
            }
            let position = map.pairs.len();
            map.by_header.insert(header.clone(), position);
            map.by_field.insert(field.clone(), position);
            map.pairs.push((header, field));
        }
        Ok(map)
    }

    /// Map where every header is used verbatim as its field name.
    pub fn identity() -> Self {
        ColumnMap::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Field a header resolves to; unmapped headers keep their own text.
    pub fn field_for<'a>(&'a self, header: &'a str) -> &'a str {
        self.by_header
            .get(header)
            .map(|&idx| self.pairs[idx].1.as_str())
            .unwrap_or(header)
    }

    /// Header a field was read from; unmapped fields are their own header.
    pub fn header_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.by_field
            .get(field)
            .map(|&idx| self.pairs[idx].0.as_str())
            .unwrap_or(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, field)| field.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(header, _)| header.as_str())
    }

    /// Inverse view, `field → header`, ordered by field name.
    pub fn field_to_header(&self) -> BTreeMap<String, String> {
        self.pairs
            .iter()
            .map(|(header, field)| (field.clone(), header.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_both_directions() {
        let map = ColumnMap::new([("年龄", "age"), ("姓名", "name")]).unwrap();
        assert_eq!(map.field_for("年龄"), "age");
        assert_eq!(map.header_for("name"), "姓名");
        assert_eq!(map.field_for("unmapped"), "unmapped");
        assert_eq!(map.header_for("other"), "other");
        let inverse = map.field_to_header();
        assert_eq!(inverse.get("age").map(String::as_str), Some("年龄"));
        assert_eq!(inverse.len(), 2);
    }

    #[test]
    fn rejects_two_headers_for_one_field() {
        let err = ColumnMap::new([("Age", "age"), ("Years", "age")]).unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)));
        assert!(err.to_string().contains("both map to field 'age'"));
    }

    #[test]
    fn rejects_repeated_header() {
        let err = ColumnMap::new([("Age", "age"), ("Age", "years")]).unwrap_err();
        assert!(err.to_string().contains("mapped more than once"));
    }

    #[test]
    fn rejects_blank_alias() {
        assert!(ColumnMap::new([("", "age")]).is_err());
    }
}
