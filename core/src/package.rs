use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OptionDefinition, OptionSchema, ValidationError, validate_schema};

/// Errors that can occur while loading a schema file.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The file parsed but the schema is structurally invalid.
    #[error("invalid schema: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serializable schema file.
///
/// A package carries the option definitions of one tool with version
/// metadata. Convert it into an [`OptionSchema`] with
/// [`into_schema`](SchemaPackage::into_schema), which validates it.
///
/// # Examples
///
/// ```
/// use option_precedence_core::*;
///
/// let yaml = r#"
/// version: "1.0.0"
/// name: build
/// options:
///   - name: verbose
///     abbreviation: v
///     kind: boolean
///     default: "false"
///   - name: jobs
///     value_type: number
///     default: "4"
/// "#;
/// let package = SchemaPackage::from_yaml_str(yaml).unwrap();
/// assert_eq!(package.option_count(), 2);
///
/// let schema = package.into_schema().unwrap();
/// assert!(schema.lookup_by_abbreviation('v').is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaPackage {
    /// Schema contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package format version (semver string).
    pub version: String,
    /// Tool name the options belong to.
    pub name: String,
    /// Optional package description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Definitions in schema order.
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

impl SchemaPackage {
    /// Creates an empty package.
    ///
    /// The `schema_version` is automatically set from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION).
    pub fn new(version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SCHEMA_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: name.into(),
            description: None,
            options: Vec::new(),
        }
    }

    /// Returns the number of definitions in this package.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Parses a package from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::JsonError`] if parsing fails.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parses a package from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::YamlError`] if parsing fails.
    pub fn from_yaml_str(raw: &str) -> Result<Self, SchemaLoadError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Loads a package from a `.json`, `.yaml` or `.yml` file.
    ///
    /// Files with any other extension are read as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::IoError`] if the file cannot be read, or a
    /// JSON/YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(serde_yaml::from_reader(reader)?),
            _ => Ok(serde_json::from_reader(reader)?),
        }
    }

    /// Builds and validates the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::Invalid`] with every validation error.
    pub fn into_schema(self) -> Result<OptionSchema, SchemaLoadError> {
        let schema = OptionSchema::from_definitions(&self.name, self.options);
        let errors = validate_schema(&schema);
        if errors.is_empty() {
            Ok(schema)
        } else {
            Err(SchemaLoadError::Invalid(errors))
        }
    }
}

impl From<&OptionSchema> for SchemaPackage {
    fn from(schema: &OptionSchema) -> Self {
        let mut package = Self::new("1.0.0", schema.name());
        package.options = schema.definitions().to_vec();
        package
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{ValueKind, ValueType};

    use super::*;

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"version":"1.0.0","name":"t","options":[{{"name":"mode","value_type":{{"choice":["a","b"]}}}}]}}"#
        )
        .unwrap();

        let package = SchemaPackage::load(file.path()).unwrap();
        assert_eq!(package.options[0].kind, ValueKind::Single);
        assert_eq!(
            package.options[0].value_type,
            ValueType::Choice(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_load_yaml_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "version: \"1.0.0\"\nname: t\noptions:\n  - name: quiet\n    kind: boolean").unwrap();

        let schema = SchemaPackage::load(file.path()).unwrap().into_schema().unwrap();
        assert!(schema.definition(schema.lookup_by_name("quiet").unwrap()).is_boolean());
    }

    #[test]
    fn test_into_schema_reports_validation_errors() {
        let mut package = SchemaPackage::new("1.0.0", "t");
        package.options.push(OptionDefinition::boolean("a"));
        package.options.push(OptionDefinition::boolean("a"));

        match package.into_schema() {
            Err(SchemaLoadError::Invalid(errors)) => {
                assert_eq!(errors, vec![ValidationError::DuplicateOption("a".into())]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_package_from_schema_keeps_order() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("b"))
            .with_option(OptionDefinition::boolean("a"));
        let package = SchemaPackage::from(&schema);
        let names: Vec<_> = package.options.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(package.schema_version.as_deref(), Some(crate::SCHEMA_CONTRACT_VERSION));
    }
}
