//! Record schema and the YAML binding file.
//!
//! A [`RecordSchema`] lists the fields of the target record in declared order
//! together with their [`FieldKind`]. Kinds are resolved once when the schema
//! is built; the coercion engine never inspects type names per cell.
//!
//! A [`BindingFile`] is the on-disk configuration used by the CLI: reading
//! options, the column each field is read from, and declarative per-field
//! constraints that are turned into a [`RuleSet`](crate::constraints::RuleSet).

use std::{collections::HashMap, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    coerce::{CoercionMode, HintLocale},
    columns::ColumnMap,
    error::EngineError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Float,
    Date,
    #[default]
    Text,
    Other,
}

impl Serialize for FieldKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        FieldKind::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Date => "date",
            FieldKind::Text => "text",
            FieldKind::Other => "other",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["integer", "float", "date", "text", "other"]
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "integer" | "int" | "long" | "short" | "byte" => Ok(FieldKind::Integer),
            "float" | "double" | "decimal" => Ok(FieldKind::Float),
            "date" | "datetime" | "timestamp" => Ok(FieldKind::Date),
            "text" | "string" => Ok(FieldKind::Text),
            "other" => Ok(FieldKind::Other),
            _ => Err(anyhow!(
                "Unknown field kind '{value}'. Supported kinds: {}",
                FieldKind::variants().join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
    positions: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new<I>(fields: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = FieldSpec>,
    {
        let mut schema = RecordSchema::default();
        for field in fields {
            if field.name.trim().is_empty() {
                return Err(EngineError::schema("Record fields must have a name"));
            }
            if schema.positions.contains_key(&field.name) {
                return Err(EngineError::schema(format!(
                    "Field '{}' is declared more than once",
                    field.name
                )));
            }
            schema
                .positions
                .insert(field.name.clone(), schema.fields.len());
            schema.fields.push(field);
        }
        Ok(schema)
    }

    pub fn builder() -> RecordSchemaBuilder {
        RecordSchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.positions.get(name).map(|&idx| self.fields[idx].kind)
    }

    /// Every field the column map targets must exist in this schema.
    pub fn ensure_covers(&self, columns: &ColumnMap) -> Result<(), EngineError> {
        for field in columns.fields() {
            if !self.contains(field) {
                return Err(EngineError::schema(format!(
                    "Column '{}' maps to unknown field '{field}'",
                    columns.header_for(field)
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordSchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl RecordSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Float)
    }

    pub fn date(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Date)
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text)
    }

    pub fn other(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Other)
    }

    pub fn build(self) -> Result<RecordSchema, EngineError> {
        RecordSchema::new(self.fields)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatterChoice {
    #[default]
    None,
    Trim,
    TrimBlank,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl FieldBinding {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingFile {
    #[serde(default)]
    pub header_row: usize,
    #[serde(default = "BindingFile::default_start_row")]
    pub start_row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_row: Option<usize>,
    #[serde(default = "BindingFile::default_row_numbers")]
    pub row_numbers: bool,
    #[serde(default)]
    pub coercion: CoercionMode,
    #[serde(default)]
    pub formatter: FormatterChoice,
    #[serde(default)]
    pub hints: HintLocale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<String>,
    pub fields: Vec<FieldBinding>,
}

impl BindingFile {
    pub const fn default_start_row() -> usize {
        1
    }

    pub const fn default_row_numbers() -> bool {
        true
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening binding file {path:?}"))?;
        let reader = BufReader::new(file);
        let binding: BindingFile =
            serde_yaml::from_reader(reader).context("Parsing binding YAML")?;
        binding
            .check()
            .with_context(|| format!("Checking binding file {path:?}"))?;
        Ok(binding)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let binding: BindingFile = serde_yaml::from_str(raw).context("Parsing binding YAML")?;
        binding.check()?;
        Ok(binding)
    }

    pub fn check(&self) -> Result<()> {
        ensure!(
            !self.fields.is_empty(),
            "Binding must declare at least one field"
        );
        for field in &self.fields {
            if let Some(pattern) = &field.pattern {
                Regex::new(pattern).with_context(|| {
                    format!("Compiling pattern for field '{}'", field.name)
                })?;
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                ensure!(
                    min <= max,
                    "Field '{}' declares min {min} greater than max {max}",
                    field.name
                );
            }
        }
        for unique in &self.unique {
            ensure!(
                self.fields.iter().any(|field| &field.name == unique),
                "Unique constraint names unknown field '{unique}'"
            );
        }
        self.record_schema()?;
        self.column_map()?;
        Ok(())
    }

    pub fn record_schema(&self) -> Result<RecordSchema, EngineError> {
        RecordSchema::new(
            self.fields
                .iter()
                .map(|field| FieldSpec::new(field.name.clone(), field.kind)),
        )
    }

    /// Only fields read from a differently named column need an alias.
    pub fn column_map(&self) -> Result<ColumnMap, EngineError> {
        ColumnMap::new(
            self.fields
                .iter()
                .filter(|field| field.column_name() != field.name)
                .map(|field| (field.column_name().to_string(), field.name.clone())),
        )
    }

    pub fn expected_headers(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.column_name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
start_row: 1
formatter: trim-blank
fields:
  - name: data_code
    column: 数据编号
    kind: integer
    required: true
  - name: name
    column: 姓名
    kind: text
    required: true
  - name: age
    column: 年龄
    kind: int
    min: 0
    max: 150
"#;

    #[test]
    fn field_kind_parses_aliases() {
        assert_eq!("Long".parse::<FieldKind>().unwrap(), FieldKind::Integer);
        assert_eq!("double".parse::<FieldKind>().unwrap(), FieldKind::Float);
        assert_eq!("timestamp".parse::<FieldKind>().unwrap(), FieldKind::Date);
        assert!("blob".parse::<FieldKind>().is_err());
    }

    #[test]
    fn schema_rejects_duplicate_fields() {
        let err = RecordSchema::builder()
            .integer("age")
            .text("age")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn schema_checks_column_map_targets() {
        let schema = RecordSchema::builder().integer("age").build().unwrap();
        let columns = ColumnMap::new([("Name", "name")]).unwrap();
        let err = schema.ensure_covers(&columns).unwrap_err();
        assert!(err.to_string().contains("unknown field 'name'"));
    }

    #[test]
    fn binding_file_parses_with_defaults() {
        let binding: BindingFile = serde_yaml::from_str(SAMPLE).unwrap();
        binding.check().unwrap();
        assert_eq!(binding.header_row, 0);
        assert!(binding.row_numbers);
        assert_eq!(binding.formatter, FormatterChoice::TrimBlank);
        assert_eq!(binding.coercion, CoercionMode::WithFormatValidation);
        assert!(binding.groups.is_none());
        let schema = binding.record_schema().unwrap();
        assert_eq!(schema.kind_of("age"), Some(FieldKind::Integer));
        let columns = binding.column_map().unwrap();
        assert_eq!(columns.field_for("年龄"), "age");
        assert_eq!(binding.expected_headers(), vec!["数据编号", "姓名", "年龄"]);
    }

    #[test]
    fn binding_file_rejects_bad_pattern_and_unknown_unique() {
        let bad_pattern = "fields:\n  - name: code\n    kind: text\n    pattern: '('\n";
        assert!(BindingFile::from_yaml_str(bad_pattern).is_err());

        let bad_unique = "unique: [missing]\nfields:\n  - name: code\n    kind: text\n";
        let err = BindingFile::from_yaml_str(bad_unique).unwrap_err();
        assert!(err.to_string().contains("unknown field 'missing'"));
    }
}
