//! One textual occurrence of an option together with its provenance.

use option_precedence_core::{OptionDefinition, OptionId, parse_bool};

use crate::OptionPriority;

/// Where an occurrence came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionOrigin {
    /// Override position.
    pub priority: OptionPriority,
    /// Human-readable source, e.g. `"command line"` or
    /// `"expanded from option --opt"`.
    pub source: String,
    /// Set when the occurrence is an implicit requirement of this option.
    pub implicit_dependent: Option<OptionId>,
    /// Set when the occurrence was injected by this expansion option.
    pub expanded_from: Option<OptionId>,
}

impl OptionOrigin {
    /// Origin of a directly supplied occurrence.
    pub fn direct(priority: OptionPriority, source: impl Into<String>) -> Self {
        Self {
            priority,
            source: source.into(),
            implicit_dependent: None,
            expanded_from: None,
        }
    }
}

/// An option as found in the input. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOccurrence {
    option: OptionId,
    command_line_form: String,
    unconverted_value: Option<String>,
    origin: OptionOrigin,
}

impl ParsedOccurrence {
    pub(crate) fn new(
        option: OptionId,
        command_line_form: String,
        unconverted_value: Option<String>,
        origin: OptionOrigin,
    ) -> Self {
        Self {
            option,
            command_line_form,
            unconverted_value,
            origin,
        }
    }

    /// The option this occurrence sets.
    pub fn option(&self) -> OptionId {
        self.option
    }

    /// The token(s) exactly as supplied, e.g. `"--jobs 4"` or `"-v-"`.
    pub fn command_line_form(&self) -> &str {
        &self.command_line_form
    }

    /// Value before conversion; `None` for void options.
    pub fn unconverted_value(&self) -> Option<&str> {
        self.unconverted_value.as_deref()
    }

    /// Provenance.
    pub fn origin(&self) -> &OptionOrigin {
        &self.origin
    }

    /// Override position.
    pub fn priority(&self) -> OptionPriority {
        self.origin.priority
    }

    /// Human-readable source.
    pub fn source(&self) -> &str {
        &self.origin.source
    }

    /// Supplied directly rather than produced by an expansion or requirement.
    pub fn is_explicit(&self) -> bool {
        self.origin.implicit_dependent.is_none() && self.origin.expanded_from.is_none()
    }

    /// Produced as an implicit requirement of another option.
    pub fn is_implicit_requirement(&self) -> bool {
        self.origin.implicit_dependent.is_some()
    }

    /// Minimal text that re-parses to the same value.
    ///
    /// Booleans render as `--name` / `--noname`, void options as `--name`,
    /// everything else as `--name=value`.
    pub fn canonical_form(&self, definition: &OptionDefinition) -> String {
        let name = &definition.name;
        match self.unconverted_value.as_deref() {
            None => format!("--{name}"),
            Some(raw) if definition.is_boolean() => match parse_bool(raw) {
                Some(true) => format!("--{name}"),
                Some(false) => format!("--no{name}"),
                None => format!("--{name}={raw}"),
            },
            Some(raw) => format!("--{name}={raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use option_precedence_core::ValueType;

    use super::*;
    use crate::PriorityCategory;

    fn occurrence(value: Option<&str>) -> ParsedOccurrence {
        ParsedOccurrence::new(
            OptionId(0),
            "-x".to_string(),
            value.map(String::from),
            OptionOrigin::direct(
                OptionPriority::lowest(PriorityCategory::CommandLine),
                "command line",
            ),
        )
    }

    #[test]
    fn test_boolean_canonical_forms() {
        let def = OptionDefinition::boolean("cache");
        assert_eq!(occurrence(Some("1")).canonical_form(&def), "--cache");
        assert_eq!(occurrence(Some("false")).canonical_form(&def), "--nocache");
    }

    #[test]
    fn test_value_canonical_forms() {
        let def = OptionDefinition::single("jobs", ValueType::Number);
        assert_eq!(occurrence(Some("4")).canonical_form(&def), "--jobs=4");
        assert_eq!(occurrence(Some("")).canonical_form(&def), "--jobs=");

        let void = OptionDefinition::void("fast");
        assert_eq!(occurrence(None).canonical_form(&void), "--fast");
    }

    #[test]
    fn test_direct_occurrence_is_explicit() {
        let occ = occurrence(Some("1"));
        assert!(occ.is_explicit());
        assert!(!occ.is_implicit_requirement());
        assert_eq!(occ.source(), "command line");
    }
}
