//! Core option schema types and value conversion.
//!
//! This crate defines the read-only table an option parser resolves command
//! line tokens against:
//!
//! - [`OptionDefinition`]: a single option with its name, abbreviation, [`ValueKind`],
//!   [`ValueType`], default, and whether it expands, implies other options,
//!   or wraps another option.
//! - [`OptionSchema`]: definitions in schema order, indexed by name and
//!   abbreviation and addressed by [`OptionId`].
//! - [`Converter`] / [`DefaultConverter`]: turn unconverted strings into
//!   [`OptionValue`]s.
//! - [`SchemaPackage`]: serializable schema file (JSON or YAML).
//!
//! Validation ([`validate_schema`]) catches structural errors such as
//! duplicate names, conflicting expansion kinds, and expansion cycles.
//!
//! # Example
//!
//! ```
//! use option_precedence_core::*;
//!
//! let schema = OptionSchema::new("build")
//!     .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'))
//!     .with_option(OptionDefinition::single("jobs", ValueType::Number).with_default("4"))
//!     .with_option(OptionDefinition::void("fast").with_expansion(["--jobs=16", "--noverbose"]));
//!
//! assert!(validate_schema(&schema).is_empty());
//! let jobs = schema.lookup_by_name("jobs").unwrap();
//! assert_eq!(
//!     DefaultConverter.convert(schema.definition(jobs), "8").unwrap(),
//!     OptionValue::Int(8),
//! );
//! ```

mod convert;
mod package;
mod types;
mod validate;

pub use convert::{ConversionError, Converter, DefaultConverter, parse_bool};
pub use package::{SchemaLoadError, SchemaPackage};
pub use types::*;
pub use validate::{ValidationError, validate_schema};
