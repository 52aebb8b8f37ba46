//! Error types for option parsing.
//!
//! Every variant carries the offending token or option name where one is
//! available. [`ParseError::is_fatal`] separates schema-authoring bugs from
//! ordinary user mistakes.

use option_precedence_core::ConversionError;
use thiserror::Error;

/// Errors that can occur while parsing options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No option with this name or abbreviation exists, or it is internal.
    #[error("unrecognized option: {0}")]
    UnrecognizedOption(String),

    /// Malformed option token.
    #[error("invalid options syntax: {token} ({reason})")]
    InvalidSyntax {
        /// Offending token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `no` prefix or `-x-` on a non-boolean, or a value after a `no` prefix.
    #[error("illegal boolean syntax: {token} ({reason})")]
    IllegalBooleanSyntax {
        /// Offending token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A value-taking option was the last token.
    #[error("expected value after {0}")]
    MissingValue(String),

    /// A converter rejected a value, including a default value.
    #[error(transparent)]
    InvalidValue(#[from] ConversionError),

    /// A wrapper option's value left tokens that are not options.
    #[error("unparsed options remain after unwrapping {token}: {}", .residue.join(" "))]
    WrapperResidue {
        /// The wrapper occurrence.
        token: String,
        /// Tokens left over.
        residue: Vec<String>,
    },

    /// An expansion or implicit requirement left tokens that are not
    /// options. The schema is wrong.
    #[error("internal error: option --{option} expanded to non-option arguments: {}", .residue.join(" "))]
    SchemaExpansionResidue {
        /// Expanding option.
        option: String,
        /// Tokens left over.
        residue: Vec<String>,
    },

    /// An option re-entered its own expansion chain. The schema is wrong.
    #[error("internal error: expansion cycle: {0}")]
    ExpansionCycle(String),

    /// A value was injected at the default category.
    #[error("cannot set option --{0} at default priority")]
    PriorityGuardViolation(String),

    /// A value was injected for an option that expands, requires or wraps.
    #[error("option --{0} cannot be set without expansion")]
    ExpansionNotAllowed(String),

    /// Residue was found while the parser disallows it.
    #[error("unrecognized arguments: {}", .0.join(" "))]
    UnexpectedResidue(Vec<String>),
}

impl ParseError {
    /// Returns `true` for errors that indicate a broken schema rather than
    /// bad input.
    ///
    /// # Examples
    ///
    /// ```
    /// use option_precedence_engine::ParseError;
    ///
    /// assert!(ParseError::ExpansionCycle("a -> a".into()).is_fatal());
    /// assert!(!ParseError::MissingValue("--jobs".into()).is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaExpansionResidue { .. } | Self::ExpansionCycle(_)
        )
    }

    pub(crate) fn syntax(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn boolean_syntax(token: &str, reason: impl Into<String>) -> Self {
        Self::IllegalBooleanSyntax {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
