//! Value aggregation.
//!
//! Every option that has been parsed at least once gets an
//! [`OptionValueDescription`] holding its contributing occurrences. The
//! effective value is computed only on request, through a [`Converter`].
//! [`ValueAggregator`] stores the descriptions in a dense array indexed by
//! [`OptionId`] and turns expansion, implicit-requirement and wrapper
//! options into [`ExpansionBundle`]s for the parser to re-parse.

use option_precedence_core::{
    ConversionError, Converter, OptionDefinition, OptionId, OptionSchema, OptionValue,
};
use tracing::warn;

use crate::error::{ParseError, Result};
use crate::ParsedOccurrence;

/// How occurrences of one option combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Highest priority wins; ties go to the later arrival.
    Override,
    /// All occurrences contribute, in priority order then arrival order.
    Accumulate,
}

impl MergeRule {
    /// The rule a definition uses.
    pub fn for_definition(definition: &OptionDefinition) -> Self {
        if definition.accumulates() {
            Self::Accumulate
        } else {
            Self::Override
        }
    }
}

/// Why an occurrence produced more tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Wrapper value to re-parse; residue is a user error.
    Wrapper,
    /// Implicit requirements; residue is a schema bug.
    ImplicitRequirement,
    /// Expansion; residue is a schema bug.
    Expansion,
}

/// Tokens an occurrence injects, with the source label to attach to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionBundle {
    /// What produced the bundle.
    pub kind: BundleKind,
    /// Raw tokens to parse.
    pub args: Vec<String>,
    /// Source label for the injected occurrences.
    pub source: String,
}

/// All occurrences of one option and the way they merge.
#[derive(Debug, Clone)]
pub struct OptionValueDescription {
    option: OptionId,
    rule: MergeRule,
    occurrences: Vec<ParsedOccurrence>,
    effective: Option<usize>,
}

impl OptionValueDescription {
    fn new(option: OptionId, rule: MergeRule) -> Self {
        Self {
            option,
            rule,
            occurrences: Vec::new(),
            effective: None,
        }
    }

    /// The option described.
    pub fn option(&self) -> OptionId {
        self.option
    }

    /// The merge rule in use.
    pub fn rule(&self) -> MergeRule {
        self.rule
    }

    /// Every occurrence in arrival order.
    pub fn occurrences(&self) -> &[ParsedOccurrence] {
        &self.occurrences
    }

    /// The occurrence providing the value of an overriding option.
    pub fn effective_occurrence(&self) -> Option<&ParsedOccurrence> {
        self.effective.map(|i| &self.occurrences[i])
    }

    /// Occurrences contributing to the value: the winner for overriding
    /// options, all of them sorted by priority (stable) for accumulating ones.
    pub fn contributing(&self) -> Vec<&ParsedOccurrence> {
        match self.rule {
            MergeRule::Override => self.effective_occurrence().into_iter().collect(),
            MergeRule::Accumulate => {
                let mut all: Vec<_> = self.occurrences.iter().collect();
                all.sort_by_key(|occ| occ.priority());
                all
            }
        }
    }

    /// Occurrences that reproduce this value when re-parsed.
    ///
    /// Expansion and wrapper options contribute nothing (what they injected
    /// is listed under the injected options), nor do implicit requirements
    /// (their parent re-creates them).
    pub fn canonical_occurrences(&self, definition: &OptionDefinition) -> Vec<&ParsedOccurrence> {
        if definition.is_expansion() || definition.wrapper {
            return Vec::new();
        }
        self.contributing()
            .into_iter()
            .filter(|occ| !occ.is_implicit_requirement())
            .collect()
    }

    /// Converts the contributing occurrences into the effective value.
    ///
    /// Wrapper options have no value of their own; they yield
    /// [`OptionValue::Unit`].
    ///
    /// # Errors
    ///
    /// Returns the converter's [`ConversionError`].
    pub fn value(
        &self,
        definition: &OptionDefinition,
        converter: &dyn Converter,
    ) -> std::result::Result<OptionValue, ConversionError> {
        if definition.wrapper {
            return Ok(OptionValue::Unit);
        }
        match self.rule {
            MergeRule::Override => match self.effective_occurrence() {
                Some(occ) => convert_occurrence(definition, occ, converter),
                None => Ok(OptionValue::Unit),
            },
            MergeRule::Accumulate => {
                let mut values = Vec::new();
                for occ in self.contributing() {
                    match convert_occurrence(definition, occ, converter)? {
                        OptionValue::List(items) => values.extend(items),
                        value => values.push(value),
                    }
                }
                Ok(OptionValue::List(values))
            }
        }
    }

    fn add(&mut self, schema: &OptionSchema, occurrence: ParsedOccurrence, warnings: &mut Vec<String>) {
        self.occurrences.push(occurrence);
        let index = self.occurrences.len() - 1;
        if self.rule == MergeRule::Accumulate {
            return;
        }

        let new = &self.occurrences[index];
        match self.effective_occurrence() {
            Some(current) if new.priority() < current.priority() => {}
            Some(current) => {
                if let Some(message) = conflict_warning(schema, current, new) {
                    warn!(option = %schema.definition(self.option).name, "{message}");
                    warnings.push(message);
                }
                self.effective = Some(index);
            }
            None => self.effective = Some(index),
        }
    }
}

fn convert_occurrence(
    definition: &OptionDefinition,
    occurrence: &ParsedOccurrence,
    converter: &dyn Converter,
) -> std::result::Result<OptionValue, ConversionError> {
    match occurrence.unconverted_value() {
        Some(raw) => converter.convert(definition, raw),
        None => Ok(OptionValue::Unit),
    }
}

/// Describes a same-category override that the user may not have seen
/// coming because one side came from an expansion or requirement.
fn conflict_warning(
    schema: &OptionSchema,
    current: &ParsedOccurrence,
    new: &ParsedOccurrence,
) -> Option<String> {
    if current.priority().category() != new.priority().category()
        || current.unconverted_value() == new.unconverted_value()
    {
        return None;
    }
    let name = |id: OptionId| schema.definition(id).name.as_str();
    let option = name(new.option());
    let old = current.origin();
    let incoming = new.origin();

    match (incoming.implicit_dependent, incoming.expanded_from) {
        (Some(dependent), _) if old.implicit_dependent == Some(dependent) => None,
        (Some(dependent), _) => Some(format!(
            "option '{option}' is implicitly defined by option '{}'; the implicitly set value overrides the previous one",
            name(dependent)
        )),
        (None, Some(expander)) => match old.expanded_from {
            Some(previous) if previous != expander => Some(format!(
                "option '{option}' was expanded to from both option '{}' and option '{}'",
                name(previous),
                name(expander)
            )),
            Some(_) => None,
            None if current.is_explicit() => Some(format!(
                "option '{}' was expanded and now overrides the explicit value of option '{option}'",
                name(expander)
            )),
            None => None,
        },
        (None, None) => match (old.expanded_from, old.implicit_dependent) {
            (Some(expander), _) => Some(format!(
                "option '{option}' was expanded from option '{}'; the explicit value overrides it",
                name(expander)
            )),
            (None, Some(dependent)) => Some(format!(
                "option '{option}' is implicitly defined by option '{}'; the explicit value overrides it",
                name(dependent)
            )),
            (None, None) => None,
        },
    }
}

/// Per-option accumulators, one slot per schema position.
#[derive(Debug, Clone)]
pub(crate) struct ValueAggregator {
    slots: Vec<Option<OptionValueDescription>>,
}

impl ValueAggregator {
    pub(crate) fn new(schema: &OptionSchema) -> Self {
        Self {
            slots: vec![None; schema.len()],
        }
    }

    /// Records `occurrence` and returns the tokens it injects, if any.
    ///
    /// Deprecation warnings are emitted once per occurrence.
    pub(crate) fn add_occurrence(
        &mut self,
        schema: &OptionSchema,
        occurrence: ParsedOccurrence,
        warnings: &mut Vec<String>,
    ) -> Result<Option<ExpansionBundle>> {
        let id = occurrence.option();
        let definition = schema.definition(id);

        if let Some(message) = definition.deprecation_message() {
            let warning = format!("option '{}' is deprecated: {message}", definition.name);
            warn!(option = %definition.name, "{warning}");
            warnings.push(warning);
        }

        let unconverted = occurrence.unconverted_value().map(str::to_string);
        let form = occurrence.command_line_form().to_string();
        self.slots[id.index()]
            .get_or_insert_with(|| OptionValueDescription::new(id, MergeRule::for_definition(definition)))
            .add(schema, occurrence, warnings);

        if definition.wrapper {
            let value = unconverted.unwrap_or_default();
            if !value.starts_with('-') {
                return Err(ParseError::syntax(
                    &form,
                    format!(
                        "wrapper option value must be an option; did you mean --{}=--{value}?",
                        definition.name
                    ),
                ));
            }
            return Ok(Some(ExpansionBundle {
                kind: BundleKind::Wrapper,
                args: vec![value],
                source: format!("unwrapped from wrapper option --{}", definition.name),
            }));
        }
        if definition.has_implicit_requirements() {
            return Ok(Some(ExpansionBundle {
                kind: BundleKind::ImplicitRequirement,
                args: definition.implicit_requirements.clone(),
                source: format!("implicit requirement of option --{}", definition.name),
            }));
        }
        if definition.is_expansion() {
            return Ok(Some(ExpansionBundle {
                kind: BundleKind::Expansion,
                args: schema.evaluated_expansion(id),
                source: format!("expanded from option --{}", definition.name),
            }));
        }
        Ok(None)
    }

    pub(crate) fn get(&self, id: OptionId) -> Option<&OptionValueDescription> {
        self.slots[id.index()].as_ref()
    }

    pub(crate) fn clear(&mut self, id: OptionId) -> Option<OptionValueDescription> {
        self.slots[id.index()].take()
    }
}
