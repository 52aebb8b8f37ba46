//! The parse engine.
//!
//! [`OptionsParser`] owns the state of one parsing session: the value
//! aggregator, the audit trail of parsed occurrences, accumulated warnings
//! and residue, and the per-category priority high-water marks. Each
//! top-level call scans its tokens, recursing into expansion bundles at a
//! locked priority, then validates every option's effective value.

use option_precedence_core::{
    Converter, DefaultConverter, OptionDefinition, OptionId, OptionSchema, OptionValue,
};
use tracing::{debug, error};

use crate::aggregator::{BundleKind, ExpansionBundle, OptionValueDescription, ValueAggregator};
use crate::error::{ParseError, Result};
use crate::priority::PriorityTable;
use crate::tokenizer::{self, ArgClass, classify_arg};
use crate::{OptionOrigin, OptionPriority, ParsedOccurrence, ParserConfig, PriorityCategory};

type SourceFn<'s> = dyn Fn(&OptionDefinition) -> String + 's;

/// Provenance shared by every occurrence of one (sub-)parse.
#[derive(Clone, Copy)]
struct Lineage {
    implicit_dependent: Option<OptionId>,
    expanded_from: Option<OptionId>,
}

impl Lineage {
    const DIRECT: Self = Self {
        implicit_dependent: None,
        expanded_from: None,
    };
}

/// Parses option tokens against a schema, layering them by priority.
///
/// # Examples
///
/// ```
/// use option_precedence_core::{OptionDefinition, OptionSchema, OptionValue, ValueType};
/// use option_precedence_engine::{OptionsParser, PriorityCategory};
///
/// let schema = OptionSchema::new("build")
///     .with_option(OptionDefinition::single("jobs", ValueType::Number).with_default("1"))
///     .with_option(OptionDefinition::void("fast").with_expansion(["--jobs=16"]));
///
/// let mut parser = OptionsParser::new(&schema);
/// parser.parse_args(PriorityCategory::RcFile, "rc", ["--jobs=2"]).unwrap();
/// let residue = parser
///     .parse_args(PriorityCategory::CommandLine, "command line", ["--fast", "target"])
///     .unwrap();
///
/// assert_eq!(residue, vec!["target".to_string()]);
/// assert_eq!(parser.value("jobs").unwrap(), OptionValue::Int(16));
/// assert_eq!(parser.canonical_form(), vec!["--jobs=16".to_string()]);
/// ```
pub struct OptionsParser<'a> {
    pub(crate) schema: &'a OptionSchema,
    pub(crate) config: ParserConfig,
    pub(crate) converter: Box<dyn Converter + 'a>,
    pub(crate) values: ValueAggregator,
    pub(crate) parsed: Vec<ParsedOccurrence>,
    pub(crate) warnings: Vec<String>,
    pub(crate) residue: Vec<String>,
    priorities: PriorityTable,
}

impl<'a> OptionsParser<'a> {
    /// Creates a parser with the default configuration and converter.
    pub fn new(schema: &'a OptionSchema) -> Self {
        Self {
            schema,
            config: ParserConfig::default(),
            converter: Box::new(DefaultConverter),
            values: ValueAggregator::new(schema),
            parsed: Vec::new(),
            warnings: Vec::new(),
            residue: Vec::new(),
            priorities: PriorityTable::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the converter used for effective values and defaults.
    pub fn with_converter(mut self, converter: impl Converter + 'a) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// The schema tokens are resolved against.
    pub fn schema(&self) -> &'a OptionSchema {
        self.schema
    }

    /// The active configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `args` at the next free priorities of `category`.
    ///
    /// `source` labels each directly supplied occurrence. Later calls at the
    /// same category outrank earlier ones. Returns this call's residue.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`]. Occurrences ingested before the
    /// failure stay recorded, and the category's high-water mark still
    /// moves past them.
    pub fn parse<F, I, S>(&mut self, category: PriorityCategory, source: F, args: I) -> Result<Vec<String>>
    where
        F: Fn(&OptionDefinition) -> String,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cursor = self.priorities.current(category);
        let args = args.into_iter().map(Into::into).collect();
        let result = self.parse_top_level(&mut cursor, &source, args);
        self.priorities.advance(cursor);
        result
    }

    /// [`parse`](Self::parse) with one source label for every occurrence.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_args<I, S>(&mut self, category: PriorityCategory, source: &str, args: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse(category, |_: &OptionDefinition| source.to_string(), args)
    }

    /// Parses `args` starting at `priority` without touching the category's
    /// high-water mark.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_at_fixed_priority<F, I, S>(
        &mut self,
        priority: OptionPriority,
        source: F,
        args: I,
    ) -> Result<Vec<String>>
    where
        F: Fn(&OptionDefinition) -> String,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cursor = OptionPriority::at(priority.category(), priority.sequence());
        let args = args.into_iter().map(Into::into).collect();
        self.parse_top_level(&mut cursor, &source, args)
    }

    fn parse_top_level(
        &mut self,
        cursor: &mut OptionPriority,
        source: &SourceFn<'_>,
        args: Vec<String>,
    ) -> Result<Vec<String>> {
        let start = *cursor;
        let mut chain = Vec::new();
        let residue = self.parse_with_source(cursor, source, Lineage::DIRECT, &mut chain, args)?;
        self.validate_values()?;

        if !residue.is_empty() && !self.config.allow_residue {
            return Err(ParseError::UnexpectedResidue(residue));
        }
        self.residue.extend(residue.iter().cloned());
        debug!(
            from = %start,
            to = %cursor,
            residue = residue.len(),
            "Parsed arguments"
        );
        Ok(residue)
    }

    fn parse_with_source(
        &mut self,
        priority: &mut OptionPriority,
        source: &SourceFn<'_>,
        lineage: Lineage,
        chain: &mut Vec<OptionId>,
        args: Vec<String>,
    ) -> Result<Vec<String>> {
        let mut residue = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match classify_arg(&arg) {
                ArgClass::Residue => residue.push(arg),
                ArgClass::Terminator => {
                    residue.extend(args.by_ref());
                    break;
                }
                ArgClass::Option => {
                    let token = tokenizer::parse_option(self.schema, &self.config, &arg, &mut args)?;
                    let definition = self.schema.definition(token.option);
                    let origin = OptionOrigin {
                        priority: *priority,
                        source: source(definition),
                        implicit_dependent: lineage.implicit_dependent,
                        expanded_from: lineage.expanded_from,
                    };
                    let occurrence = token.into_occurrence(origin);
                    if lineage.implicit_dependent.is_none() || definition.wrapper {
                        self.parsed.push(occurrence.clone());
                    }

                    let form = occurrence.command_line_form().to_string();
                    let id = occurrence.option();
                    if let Some(bundle) =
                        self.values
                            .add_occurrence(self.schema, occurrence, &mut self.warnings)?
                    {
                        self.parse_bundle(*priority, id, &form, bundle, chain)?;
                    }
                    *priority = priority.next();
                }
            }
        }
        Ok(residue)
    }

    /// Re-parses the tokens `option` injected, pinned to its priority.
    fn parse_bundle(
        &mut self,
        priority: OptionPriority,
        option: OptionId,
        form: &str,
        bundle: ExpansionBundle,
        chain: &mut Vec<OptionId>,
    ) -> Result<()> {
        let name = self.schema.definition(option).name.clone();
        // Wrapper values shrink at every level, so only schema-driven
        // bundles can loop.
        let guarded = bundle.kind != BundleKind::Wrapper;
        if guarded && chain.contains(&option) {
            let path: Vec<&str> = chain
                .iter()
                .chain(std::iter::once(&option))
                .map(|id| self.schema.definition(*id).name.as_str())
                .collect();
            let path = path.join(" -> ");
            error!(option = %name, %path, "Expansion cycle");
            return Err(ParseError::ExpansionCycle(path));
        }

        debug!(option = %name, kind = ?bundle.kind, args = ?bundle.args, priority = %priority, "Expanding");
        let lineage = match bundle.kind {
            BundleKind::Wrapper => Lineage::DIRECT,
            BundleKind::ImplicitRequirement => Lineage {
                implicit_dependent: Some(option),
                expanded_from: None,
            },
            BundleKind::Expansion => Lineage {
                implicit_dependent: None,
                expanded_from: Some(option),
            },
        };
        let label = bundle.source;
        let label_fn = move |_: &OptionDefinition| label.clone();
        let mut locked = priority.locked();

        if guarded {
            chain.push(option);
        }
        let result = self.parse_with_source(&mut locked, &label_fn, lineage, chain, bundle.args);
        if guarded {
            chain.pop();
        }

        let residue = match (bundle.kind, result) {
            (BundleKind::Wrapper, Err(ParseError::UnrecognizedOption(token))) => {
                return Err(ParseError::WrapperResidue {
                    token: form.to_string(),
                    residue: vec![token],
                });
            }
            (_, result) => result?,
        };
        if residue.is_empty() {
            return Ok(());
        }
        match bundle.kind {
            BundleKind::Wrapper => Err(ParseError::WrapperResidue {
                token: form.to_string(),
                residue,
            }),
            BundleKind::ImplicitRequirement | BundleKind::Expansion => {
                error!(option = %name, ?residue, "Expansion produced non-option arguments");
                Err(ParseError::SchemaExpansionResidue { option: name, residue })
            }
        }
    }

    /// Converts every option's effective value, defaults included.
    fn validate_values(&self) -> Result<()> {
        for (id, _) in self.schema.iter() {
            self.effective_value(id)?;
        }
        Ok(())
    }

    pub(crate) fn effective_value(&self, id: OptionId) -> Result<OptionValue> {
        let definition = self.schema.definition(id);
        match self.values.get(id) {
            Some(description) => Ok(description.value(definition, &*self.converter)?),
            None => self.default_value(definition),
        }
    }

    fn default_value(&self, definition: &OptionDefinition) -> Result<OptionValue> {
        let value = match (&definition.default, definition.accumulates()) {
            (Some(raw), false) => self.converter.convert(definition, raw)?,
            (Some(raw), true) => match self.converter.convert(definition, raw)? {
                list @ OptionValue::List(_) => list,
                value => OptionValue::List(vec![value]),
            },
            (None, true) => OptionValue::List(Vec::new()),
            (None, false) if definition.is_boolean() => OptionValue::Bool(false),
            (None, false) => OptionValue::Unit,
        };
        Ok(value)
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<OptionId> {
        self.schema
            .lookup_by_name(name)
            .ok_or_else(|| ParseError::UnrecognizedOption(format!("--{name}")))
    }

    /// Sets one option programmatically, as if `--name=value` had been
    /// parsed at `priority`.
    ///
    /// The value is converted before anything is recorded. The category's
    /// high-water mark is not advanced.
    ///
    /// # Errors
    ///
    /// - [`ParseError::UnrecognizedOption`] for an unknown name.
    /// - [`ParseError::PriorityGuardViolation`] at the default category.
    /// - [`ParseError::ExpansionNotAllowed`] for options that expand, carry
    ///   implicit requirements, or wrap.
    /// - [`ParseError::InvalidSyntax`] for void options, which take no value.
    /// - [`ParseError::InvalidValue`] if conversion fails.
    pub fn set_value_at_priority(
        &mut self,
        priority: OptionPriority,
        source: &str,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let id = self.lookup(name)?;
        let definition = self.schema.definition(id);
        if priority.category() == PriorityCategory::Default {
            return Err(ParseError::PriorityGuardViolation(definition.name.clone()));
        }
        if definition.is_expansion() || definition.has_implicit_requirements() || definition.wrapper {
            return Err(ParseError::ExpansionNotAllowed(definition.name.clone()));
        }
        let form = format!("--{}={value}", definition.name);
        if definition.is_void() {
            return Err(ParseError::syntax(
                &form,
                format!("option --{} does not take a value", definition.name),
            ));
        }
        self.converter.convert(definition, value)?;

        let occurrence = ParsedOccurrence::new(
            id,
            form,
            Some(value.to_string()),
            OptionOrigin::direct(priority, source),
        );
        debug!(option = %definition.name, %priority, value, "Setting value");
        self.parsed.push(occurrence.clone());
        self.values
            .add_occurrence(self.schema, occurrence, &mut self.warnings)?;
        Ok(())
    }

    /// Removes every recorded occurrence of `name` from the value
    /// computation; the option falls back to its default.
    ///
    /// Returns the removed entry, if the option had been set.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnrecognizedOption`] for an unknown name.
    pub fn clear_value(&mut self, name: &str) -> Result<Option<OptionValueDescription>> {
        let id = self.lookup(name)?;
        Ok(self.values.clear(id))
    }
}
