//! Priority-ordered option parsing.
//!
//! An [`OptionsParser`] resolves command-line style tokens against an
//! [`OptionSchema`](option_precedence_core::OptionSchema) and folds every
//! occurrence into per-option values:
//!
//! - Each occurrence carries an [`OptionPriority`]: a [`PriorityCategory`]
//!   (default, rc file, command line, policy...) plus a sequence number.
//!   Single-valued options take the highest-priority occurrence; later
//!   arrivals win ties. Accumulating options concatenate in priority order.
//! - Expansion options inject more tokens at their own (locked) priority,
//!   so the injected block sorts exactly where the expansion appeared.
//!   Implicit requirements do the same but stay out of the explicit view.
//!   Wrapper options re-parse their value as a command line.
//! - Every occurrence keeps its provenance ([`OptionOrigin`]), enabling
//!   [`explicit_occurrences`](OptionsParser::explicit_occurrences) and a
//!   [`canonical_form`](OptionsParser::canonical_form) that re-parses to
//!   the same effective values.
//!
//! [`InvocationPlan`] replays layered batches of arguments from YAML.
//!
//! # Example
//!
//! ```
//! use option_precedence_core::{OptionDefinition, OptionSchema, OptionValue, ValueType};
//! use option_precedence_engine::{OptionsParser, PriorityCategory};
//!
//! let schema = OptionSchema::new("build")
//!     .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'))
//!     .with_option(OptionDefinition::single("jobs", ValueType::Number).with_default("4"));
//!
//! let mut parser = OptionsParser::new(&schema);
//! parser.parse_args(PriorityCategory::InvocationPolicy, "policy", ["--jobs=2"]).unwrap();
//! parser.parse_args(PriorityCategory::CommandLine, "command line", ["-v", "--jobs=8"]).unwrap();
//!
//! // Policy outranks the command line.
//! assert_eq!(parser.value("jobs").unwrap(), OptionValue::Int(2));
//! assert_eq!(parser.value("verbose").unwrap(), OptionValue::Bool(true));
//! ```

mod aggregator;
mod config;
mod error;
mod occurrence;
mod parser;
mod plan;
mod priority;
mod tokenizer;
mod views;

pub use aggregator::{BundleKind, ExpansionBundle, MergeRule, OptionValueDescription};
pub use config::ParserConfig;
pub use error::{ParseError, Result};
pub use occurrence::{OptionOrigin, ParsedOccurrence};
pub use parser::OptionsParser;
pub use plan::{Batch, InvocationPlan, PlanError};
pub use priority::{OptionPriority, PriorityCategory};
pub use tokenizer::{ArgClass, classify_arg};
pub use views::EffectiveValues;
