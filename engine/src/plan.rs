//! Invocation plans: ordered batches of raw tokens to feed a parser.
//!
//! A plan describes where each batch of arguments comes from (its priority
//! category and source label), so the same layered configuration can be
//! replayed from a file.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! parser:
//!   allow_residue: false
//! batches:
//!   - category: rc-file
//!     source: ~/.toolrc
//!     args: ["--jobs=4", "--cache"]
//!   - category: invocation-policy
//!     source: site policy
//!     args: ["--nocache"]
//!     fixed_sequence: 0
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{OptionPriority, OptionsParser, ParseError, ParserConfig, PriorityCategory};

/// Errors that can occur while loading or applying a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A batch failed to parse.
    #[error("batch {index} ({source_label}): {error}")]
    Batch {
        /// Position of the batch in the plan.
        index: usize,
        /// The batch's source label.
        source_label: String,
        /// Underlying parse failure.
        error: ParseError,
    },
}

/// One batch of raw tokens at one priority category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Priority category of every token in the batch.
    pub category: PriorityCategory,
    /// Source label attached to the parsed occurrences.
    pub source: String,
    /// Raw tokens.
    #[serde(default)]
    pub args: Vec<String>,
    /// Pin the batch to this sequence without advancing the category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_sequence: Option<u64>,
}

/// Ordered batches plus parser settings.
///
/// # Examples
///
/// ```
/// use option_precedence_engine::{InvocationPlan, PriorityCategory};
///
/// let yaml = r#"
/// version: "1.0"
/// batches:
///   - category: rc-file
///     source: rc
///     args: ["--jobs=2"]
/// "#;
/// let plan: InvocationPlan = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(plan.batches[0].category, PriorityCategory::RcFile);
/// assert!(plan.parser.allow_residue);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationPlan {
    /// Plan format version (e.g., `"1.0"`).
    pub version: String,
    /// Parser settings.
    #[serde(default)]
    pub parser: ParserConfig,
    /// Batches in application order.
    #[serde(default)]
    pub batches: Vec<Batch>,
}

impl InvocationPlan {
    /// Loads a plan from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::IoError`] if the file cannot be read, or
    /// [`PlanError::YamlError`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let plan = serde_yaml::from_reader(reader)?;
        Ok(plan)
    }

    /// Saves the plan as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::IoError`] if the file cannot be written, or
    /// [`PlanError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Appends a batch.
    pub fn with_batch<I, S>(mut self, category: PriorityCategory, source: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.batches.push(Batch {
            category,
            source: source.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            fixed_sequence: None,
        });
        self
    }

    /// Feeds every batch to `parser` in order and returns the residue of
    /// all batches.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Batch`] for the first batch that fails.
    pub fn apply(&self, parser: &mut OptionsParser<'_>) -> Result<Vec<String>, PlanError> {
        let mut residue = Vec::new();
        for (index, batch) in self.batches.iter().enumerate() {
            debug!(index, category = %batch.category, source = %batch.source, "Applying batch");
            let source = batch.source.clone();
            let label = move |_: &option_precedence_core::OptionDefinition| source.clone();
            let result = match batch.fixed_sequence {
                Some(sequence) => parser.parse_at_fixed_priority(
                    OptionPriority::at(batch.category, sequence),
                    label,
                    batch.args.iter().cloned(),
                ),
                None => parser.parse(batch.category, label, batch.args.iter().cloned()),
            };
            let batch_residue = result.map_err(|error| PlanError::Batch {
                index,
                source_label: batch.source.clone(),
                error,
            })?;
            residue.extend(batch_residue);
        }
        Ok(residue)
    }
}
