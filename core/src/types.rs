//! Option schema type definitions.
//!
//! This module defines the read-only table the parser resolves tokens
//! against: [`OptionDefinition`] rows collected into an [`OptionSchema`].
//! Definitions are addressed by [`OptionId`], their position in the schema,
//! which is also the canonical order used when reproducing a command line.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Version of the schema contract (semver).
///
/// Embedded in every [`SchemaPackage`](crate::SchemaPackage) to track
/// compatibility of schema files.
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Position of a definition inside its [`OptionSchema`].
///
/// Ids are dense, start at zero and follow declaration order, so they can
/// index per-option arrays directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub usize);

impl OptionId {
    /// Returns the raw schema position.
    pub fn index(self) -> usize {
        self.0
    }
}

/// How an option consumes its value on the command line.
///
/// # Examples
///
/// ```
/// use option_precedence_core::ValueKind;
///
/// assert_eq!(ValueKind::default(), ValueKind::Single);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    /// `--name`, `--noname`, `--name=false`, `-n`, `-n-`.
    Boolean,
    /// Takes exactly one value, inline or as the next token.
    #[default]
    Single,
    /// Takes one value that is split on `,` into a list.
    Repeated,
    /// Takes no value at all (typically expansion options).
    Void,
}

/// Value type used by the [`DefaultConverter`](crate::DefaultConverter).
///
/// # Examples
///
/// ```
/// use option_precedence_core::ValueType;
///
/// let choice = ValueType::Choice(vec!["fast".into(), "small".into()]);
/// assert!(matches!(choice, ValueType::Choice(_)));
/// assert_eq!(ValueType::default(), ValueType::Any);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// Free-form string.
    String,
    /// Signed integer.
    Number,
    /// Floating point number.
    Float,
    /// Filesystem path, kept as a string.
    Path,
    /// One of a fixed set of strings.
    Choice(Vec<String>),
    /// Unknown/any type (the default); kept as a string.
    #[default]
    Any,
}

/// Function computing an expansion from the schema at parse time.
pub type ExpansionFn = dyn Fn(&OptionSchema) -> Vec<String> + Send + Sync;

/// Schema-computed expansion attached to a definition.
#[derive(Clone)]
pub struct ComputedExpansion(Arc<ExpansionFn>);

impl ComputedExpansion {
    /// Wraps an expansion function.
    pub fn new(f: impl Fn(&OptionSchema) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    fn evaluate(&self, schema: &OptionSchema) -> Vec<String> {
        (self.0)(schema)
    }
}

impl fmt::Debug for ComputedExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputedExpansion(..)")
    }
}

/// One option the parser knows about.
///
/// Use the constructors [`boolean`](OptionDefinition::boolean),
/// [`single`](OptionDefinition::single),
/// [`repeated`](OptionDefinition::repeated) and
/// [`void`](OptionDefinition::void), then chain builder methods.
///
/// At most one of `expansion` (or a computed expansion),
/// `implicit_requirements` and `wrapper` may be set; see
/// [`validate_schema`](crate::validate_schema).
///
/// # Examples
///
/// ```
/// use option_precedence_core::{OptionDefinition, ValueType};
///
/// let verbose = OptionDefinition::boolean("verbose")
///     .with_abbreviation('v')
///     .with_default("false");
/// assert!(verbose.is_boolean());
/// assert_eq!(verbose.abbreviation, Some('v'));
///
/// let opt = OptionDefinition::void("opt").with_expansion(["--level=3", "--nodebug"]);
/// assert!(opt.is_expansion());
///
/// let jobs = OptionDefinition::single("jobs", ValueType::Number).with_default("4");
/// assert!(!jobs.accumulates());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDefinition {
    /// Long name, without leading dashes.
    pub name: String,
    /// Single-character abbreviation used as `-x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<char>,
    /// How the value is taken from the command line.
    #[serde(default)]
    pub kind: ValueKind,
    /// How the value is converted.
    #[serde(default)]
    pub value_type: ValueType,
    /// Unconverted default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Occurrences accumulate instead of overriding each other.
    #[serde(default)]
    pub allow_multiple: bool,
    /// Literal tokens injected whenever this option is parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expansion: Vec<String>,
    /// Literal tokens forced in alongside this option, hidden from explicit views.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicit_requirements: Vec<String>,
    /// The value is itself an option token to re-parse.
    #[serde(default)]
    pub wrapper: bool,
    /// Deprecation message; empty or absent means not deprecated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
    /// Hidden from parsing entirely.
    #[serde(default)]
    pub internal: bool,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip)]
    computed_expansion: Option<ComputedExpansion>,
}

impl OptionDefinition {
    fn new(name: &str, kind: ValueKind, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: None,
            kind,
            value_type,
            default: None,
            allow_multiple: false,
            expansion: Vec::new(),
            implicit_requirements: Vec::new(),
            wrapper: false,
            deprecation: None,
            internal: false,
            description: None,
            computed_expansion: None,
        }
    }

    /// Creates a boolean option.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, ValueKind::Boolean, ValueType::Any)
    }

    /// Creates an option taking a single value.
    pub fn single(name: &str, value_type: ValueType) -> Self {
        Self::new(name, ValueKind::Single, value_type)
    }

    /// Creates an option whose value is a comma-separated list.
    pub fn repeated(name: &str, value_type: ValueType) -> Self {
        Self::new(name, ValueKind::Repeated, value_type)
    }

    /// Creates an option that takes no value.
    pub fn void(name: &str) -> Self {
        Self::new(name, ValueKind::Void, ValueType::Any)
    }

    /// Creates a wrapper option: its value is re-parsed as an option token.
    ///
    /// # Examples
    ///
    /// ```
    /// use option_precedence_core::{OptionDefinition, ValueKind};
    ///
    /// let w = OptionDefinition::wrapper("wrapped");
    /// assert!(w.wrapper);
    /// assert_eq!(w.kind, ValueKind::Single);
    /// ```
    pub fn wrapper(name: &str) -> Self {
        let mut def = Self::new(name, ValueKind::Single, ValueType::String);
        def.wrapper = true;
        def
    }

    /// Sets the single-character abbreviation.
    pub fn with_abbreviation(mut self, abbreviation: char) -> Self {
        self.abbreviation = Some(abbreviation);
        self
    }

    /// Sets the unconverted default value.
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Marks as accumulating across occurrences.
    pub fn allow_multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    /// Sets the literal expansion.
    pub fn with_expansion<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expansion = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an expansion computed from the schema when the option is parsed.
    pub fn with_computed_expansion(
        mut self,
        f: impl Fn(&OptionSchema) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.computed_expansion = Some(ComputedExpansion::new(f));
        self
    }

    /// Sets the implicit requirements.
    pub fn with_implicit_requirements<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implicit_requirements = args.into_iter().map(Into::into).collect();
        self
    }

    /// Marks as deprecated with the given message.
    pub fn deprecated(mut self, message: &str) -> Self {
        self.deprecation = Some(message.to_string());
        self
    }

    /// Hides the option from parsing.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Returns `true` for [`ValueKind::Boolean`].
    pub fn is_boolean(&self) -> bool {
        self.kind == ValueKind::Boolean
    }

    /// Returns `true` for [`ValueKind::Void`].
    pub fn is_void(&self) -> bool {
        self.kind == ValueKind::Void
    }

    /// Returns `true` if parsing this option injects expansion tokens.
    pub fn is_expansion(&self) -> bool {
        !self.expansion.is_empty() || self.computed_expansion.is_some()
    }

    /// Returns `true` if this option forces implicit requirements in.
    pub fn has_implicit_requirements(&self) -> bool {
        !self.implicit_requirements.is_empty()
    }

    /// Returns `true` if occurrences accumulate rather than override.
    pub fn accumulates(&self) -> bool {
        self.allow_multiple
    }

    /// Returns `true` if a value must follow the option name.
    ///
    /// Void options take none unless they are wrappers.
    pub fn takes_value(&self) -> bool {
        match self.kind {
            ValueKind::Boolean => false,
            ValueKind::Void => self.wrapper,
            ValueKind::Single | ValueKind::Repeated => true,
        }
    }

    /// Returns the deprecation message, treating an empty one as absent.
    pub fn deprecation_message(&self) -> Option<&str> {
        self.deprecation.as_deref().filter(|m| !m.is_empty())
    }
}

/// Immutable table of option definitions with name and abbreviation indexes.
///
/// # Examples
///
/// ```
/// use option_precedence_core::{OptionDefinition, OptionSchema, ValueType};
///
/// let schema = OptionSchema::new("build")
///     .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'))
///     .with_option(OptionDefinition::single("jobs", ValueType::Number));
///
/// let id = schema.lookup_by_name("jobs").unwrap();
/// assert_eq!(schema.definition(id).name, "jobs");
/// assert_eq!(schema.lookup_by_abbreviation('v'), schema.lookup_by_name("verbose"));
/// assert!(schema.lookup_by_name("missing").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    name: String,
    options: Vec<OptionDefinition>,
    by_name: HashMap<String, OptionId>,
    by_abbreviation: HashMap<char, OptionId>,
}

impl OptionSchema {
    /// Creates an empty schema.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Builds a schema from definitions in declaration order.
    pub fn from_definitions(name: &str, options: impl IntoIterator<Item = OptionDefinition>) -> Self {
        options
            .into_iter()
            .fold(Self::new(name), |schema, def| schema.with_option(def))
    }

    /// Appends a definition. The first definition with a given name or
    /// abbreviation owns it; duplicates are reported by validation.
    pub fn with_option(mut self, definition: OptionDefinition) -> Self {
        let id = OptionId(self.options.len());
        self.by_name.entry(definition.name.clone()).or_insert(id);
        if let Some(abbrev) = definition.abbreviation {
            self.by_abbreviation.entry(abbrev).or_insert(id);
        }
        self.options.push(definition);
        self
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns `true` if the schema has no definitions.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// All definitions in schema order.
    pub fn definitions(&self) -> &[OptionDefinition] {
        &self.options
    }

    /// Iterates `(id, definition)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionId, &OptionDefinition)> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, def)| (OptionId(i), def))
    }

    /// Returns the definition at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this schema.
    pub fn definition(&self, id: OptionId) -> &OptionDefinition {
        &self.options[id.0]
    }

    /// Resolves a long name.
    pub fn lookup_by_name(&self, name: &str) -> Option<OptionId> {
        self.by_name.get(name).copied()
    }

    /// Resolves a single-character abbreviation.
    pub fn lookup_by_abbreviation(&self, abbreviation: char) -> Option<OptionId> {
        self.by_abbreviation.get(&abbreviation).copied()
    }

    /// Returns the tokens an expansion option injects.
    ///
    /// Computed expansions are evaluated against this schema on every call;
    /// otherwise the literal expansion list is returned.
    pub fn evaluated_expansion(&self, id: OptionId) -> Vec<String> {
        let def = self.definition(id);
        match &def.computed_expansion {
            Some(computed) => computed.evaluate(self),
            None => def.expansion.clone(),
        }
    }
}

/// A converted option value.
///
/// Serialized untagged, so `OptionValue::Int(3)` becomes `3` and
/// [`OptionValue::Unit`] becomes `null`.
///
/// # Examples
///
/// ```
/// use option_precedence_core::OptionValue;
///
/// let v = OptionValue::List(vec![OptionValue::Str("a".into()), OptionValue::Int(2)]);
/// assert_eq!(v.to_string(), "a,2");
/// assert_eq!(serde_json::to_string(&v).unwrap(), r#"["a",2]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean option value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String, path or choice value.
    Str(String),
    /// Accumulated or comma-separated values.
    List(Vec<OptionValue>),
    /// Value of a void option, or of an unset option without a default.
    Unit,
}

impl OptionValue {
    /// Returns the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the list payload, if any.
    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Unit => f.write_str("<none>"),
        }
    }
}
