//! Option schema validation.
//!
//! Validates structural invariants of an [`OptionSchema`], catching errors
//! such as duplicate names, options that are both an expansion and a wrapper,
//! expansions naming unknown options, and expansion cycles before the parser
//! ever sees them.
//!
//! # Examples
//!
//! ```
//! use option_precedence_core::*;
//!
//! let schema = OptionSchema::new("build")
//!     .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'));
//! assert!(validate_schema(&schema).is_empty());
//!
//! // Invalid: two options share an abbreviation
//! let bad = OptionSchema::new("build")
//!     .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'))
//!     .with_option(OptionDefinition::boolean("version").with_abbreviation('v'));
//! assert!(!validate_schema(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{OptionDefinition, OptionId, OptionSchema, ValueKind};

/// Schema validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Option name is empty or whitespace-only.
    #[error("option name cannot be empty")]
    EmptyOptionName,
    /// Option name contains `=`, whitespace, or a leading dash.
    #[error("invalid option name: {0}")]
    InvalidOptionName(String),
    /// Abbreviation is not an ASCII letter or digit.
    #[error("invalid abbreviation for option {option}: '{abbreviation}'")]
    InvalidAbbreviation {
        /// Option name.
        option: String,
        /// Offending abbreviation.
        abbreviation: char,
    },
    /// Two options share a name.
    #[error("duplicate option: {0}")]
    DuplicateOption(String),
    /// Two options share an abbreviation.
    #[error("duplicate abbreviation: -{0}")]
    DuplicateAbbreviation(char),
    /// A `no`-prefixed name collides with the negation of a boolean option.
    #[error("option {0} collides with the negated form of a boolean option")]
    NegationCollision(String),
    /// More than one of expansion, implicit requirements and wrapper is set.
    #[error("option {0} may set only one of expansion, implicit requirements, wrapper")]
    ConflictingExpansionKinds(String),
    /// Boolean options cannot accumulate.
    #[error("boolean option {0} cannot allow multiple occurrences")]
    MultipleBoolean(String),
    /// Wrapper options must take a value.
    #[error("wrapper option {0} must take a value")]
    InvalidWrapper(String),
    /// An expansion or implicit requirement names an unknown option.
    #[error("option {option} expands to unknown option: {target}")]
    UnknownExpansionTarget {
        /// Expanding option.
        option: String,
        /// Token that failed to resolve.
        target: String,
    },
    /// Expansions or implicit requirements lead back to an option already on
    /// the chain (e.g. `a -> b -> a`).
    #[error("expansion cycle detected at path: {0}")]
    ExpansionCycle(String),
}

/// Validates an option schema.
///
/// Per-option checks run first; cross-option checks (expansion targets and
/// cycles) only run when those succeed.
///
/// # Examples
///
/// ```
/// use option_precedence_core::*;
///
/// // Expansion cycle: a -> b -> a
/// let schema = OptionSchema::new("t")
///     .with_option(OptionDefinition::void("a").with_expansion(["--b"]))
///     .with_option(OptionDefinition::void("b").with_expansion(["--a"]));
/// let errors = validate_schema(&schema);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::ExpansionCycle(_))));
/// ```
pub fn validate_schema(schema: &OptionSchema) -> Vec<ValidationError> {
    let mut errors = validate_definitions(schema.definitions());
    if !errors.is_empty() {
        return errors;
    }

    errors.extend(validate_expansion_targets(schema));
    if !errors.is_empty() {
        return errors;
    }

    let mut path = Vec::new();
    let mut done = HashSet::new();
    for (id, _) in schema.iter() {
        if let Some(err) = find_cycle(schema, id, &mut path, &mut done) {
            errors.push(err);
            return errors;
        }
    }

    errors
}

fn validate_definitions(definitions: &[OptionDefinition]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut abbreviations = HashSet::new();

    for def in definitions {
        let name = def.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyOptionName);
            continue;
        }
        if name.starts_with('-') || name.contains('=') || name.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidOptionName(def.name.clone()));
        }
        if !names.insert(name) {
            errors.push(ValidationError::DuplicateOption(def.name.clone()));
        }

        if let Some(abbrev) = def.abbreviation {
            if !abbrev.is_ascii_alphanumeric() {
                errors.push(ValidationError::InvalidAbbreviation {
                    option: def.name.clone(),
                    abbreviation: abbrev,
                });
            } else if !abbreviations.insert(abbrev) {
                errors.push(ValidationError::DuplicateAbbreviation(abbrev));
            }
        }

        let expansion_kinds = [def.is_expansion(), def.has_implicit_requirements(), def.wrapper]
            .iter()
            .filter(|set| **set)
            .count();
        if expansion_kinds > 1 {
            errors.push(ValidationError::ConflictingExpansionKinds(def.name.clone()));
        }

        if def.is_boolean() && def.allow_multiple {
            errors.push(ValidationError::MultipleBoolean(def.name.clone()));
        }
        if def.wrapper && def.kind == ValueKind::Boolean {
            errors.push(ValidationError::InvalidWrapper(def.name.clone()));
        }
    }

    for def in definitions.iter().filter(|d| d.is_boolean()) {
        let negated = format!("no{}", def.name);
        if names.contains(negated.as_str()) {
            errors.push(ValidationError::NegationCollision(negated));
        }
    }

    errors
}

fn validate_expansion_targets(schema: &OptionSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (id, def) in schema.iter() {
        let mut tokens = schema.evaluated_expansion(id);
        tokens.extend(def.implicit_requirements.iter().cloned());
        for token in tokens {
            if let Some(Err(target)) = referenced_option(schema, &token) {
                errors.push(ValidationError::UnknownExpansionTarget {
                    option: def.name.clone(),
                    target,
                });
            }
        }
    }
    errors
}

/// Resolves the option a literal long-form token refers to.
///
/// Returns `None` for tokens that are not long options (values, residue,
/// abbreviations), `Some(Err(token))` if the name is unknown.
fn referenced_option(schema: &OptionSchema, token: &str) -> Option<Result<OptionId, String>> {
    let rest = token.strip_prefix("--")?;
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    if name.is_empty() {
        return None;
    }
    let resolved = schema.lookup_by_name(name).or_else(|| {
        name.strip_prefix("no")
            .and_then(|stripped| schema.lookup_by_name(stripped))
            .filter(|id| schema.definition(*id).is_boolean())
    });
    Some(resolved.ok_or_else(|| token.to_string()))
}

fn find_cycle(
    schema: &OptionSchema,
    id: OptionId,
    path: &mut Vec<OptionId>,
    done: &mut HashSet<OptionId>,
) -> Option<ValidationError> {
    if done.contains(&id) {
        return None;
    }
    if path.contains(&id) {
        let cycle_path = path
            .iter()
            .chain(std::iter::once(&id))
            .map(|step| schema.definition(*step).name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        return Some(ValidationError::ExpansionCycle(cycle_path));
    }

    let def = schema.definition(id);
    let mut tokens = schema.evaluated_expansion(id);
    tokens.extend(def.implicit_requirements.iter().cloned());

    path.push(id);
    for token in &tokens {
        if let Some(Ok(next)) = referenced_option(schema, token) {
            if let Some(err) = find_cycle(schema, next, path, done) {
                return Some(err);
            }
        }
    }
    path.pop();
    done.insert(id);
    None
}

#[cfg(test)]
mod tests {
    use crate::ValueType;

    use super::*;

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("a"))
            .with_option(OptionDefinition::void("a"));

        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::DuplicateOption("a".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_conflicting_expansion_kinds() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("b"))
            .with_option(
                OptionDefinition::void("a")
                    .with_expansion(["--b"])
                    .with_implicit_requirements(["--b"]),
            );

        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::ConflictingExpansionKinds("a".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_negation_collision() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("cache"))
            .with_option(OptionDefinition::single("nocache", ValueType::String));

        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::NegationCollision("nocache".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_unknown_expansion_target() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::void("opt").with_expansion(["--missing=1"]));

        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::UnknownExpansionTarget {
                option: "opt".to_string(),
                target: "--missing=1".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_accepts_negated_expansion_target() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("debug"))
            .with_option(OptionDefinition::void("release").with_expansion(["--nodebug"]));

        assert!(validate_schema(&schema).is_empty());
    }

    #[test]
    fn test_validate_reports_cycle_path() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::void("a").with_expansion(["--b"]))
            .with_option(OptionDefinition::void("b").with_implicit_requirements(["--c"]))
            .with_option(OptionDefinition::void("c").with_expansion(["--a"]));

        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::ExpansionCycle("a -> b -> c -> a".to_string())]
        );
    }

    #[test]
    fn test_validate_allows_shared_targets_without_cycle() {
        let schema = OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("x"))
            .with_option(OptionDefinition::void("a").with_expansion(["--x"]))
            .with_option(OptionDefinition::void("b").with_expansion(["--x", "--a"]));

        assert!(validate_schema(&schema).is_empty());
    }
}
