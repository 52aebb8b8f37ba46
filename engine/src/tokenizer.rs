//! Token classification and option resolution.
//!
//! [`classify_arg`] decides whether a raw token is residue, the `--`
//! terminator, or an option. [`parse_option`] resolves an option token
//! against the schema, pulling its value from the remaining tokens when
//! needed; the parser attaches provenance to turn it into a
//! [`ParsedOccurrence`].

use option_precedence_core::{OptionId, OptionSchema};

use crate::error::{ParseError, Result};
use crate::{OptionOrigin, ParsedOccurrence, ParserConfig};

/// Classification of a command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgClass {
    /// Starts with `-` (except a lone `-`).
    Option,
    /// Not an option; returned to the caller.
    Residue,
    /// `--`: every following token is residue.
    Terminator,
}

/// Classify a single token.
///
/// # Examples
///
/// ```
/// use option_precedence_engine::{ArgClass, classify_arg};
///
/// assert_eq!(classify_arg("--jobs=4"), ArgClass::Option);
/// assert_eq!(classify_arg("-v"), ArgClass::Option);
/// assert_eq!(classify_arg("--"), ArgClass::Terminator);
/// assert_eq!(classify_arg("file.txt"), ArgClass::Residue);
/// assert_eq!(classify_arg("-"), ArgClass::Residue);
/// ```
pub fn classify_arg(arg: &str) -> ArgClass {
    match arg {
        // Lone dash is residue (stdin convention)
        "-" => ArgClass::Residue,
        "--" => ArgClass::Terminator,
        s if s.starts_with('-') => ArgClass::Option,
        _ => ArgClass::Residue,
    }
}

/// An option token resolved against the schema, not yet attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedToken {
    pub(crate) option: OptionId,
    pub(crate) command_line_form: String,
    pub(crate) unconverted_value: Option<String>,
}

impl ResolvedToken {
    pub(crate) fn into_occurrence(self, origin: OptionOrigin) -> ParsedOccurrence {
        ParsedOccurrence::new(
            self.option,
            self.command_line_form,
            self.unconverted_value,
            origin,
        )
    }
}

/// Resolves one option token.
///
/// `rest` supplies the value of options that take one and had no inline
/// `=value`; the consumed token is appended to the command-line form.
pub(crate) fn parse_option(
    schema: &OptionSchema,
    config: &ParserConfig,
    arg: &str,
    rest: &mut dyn Iterator<Item = String>,
) -> Result<ResolvedToken> {
    let (id, mut value) = resolve(schema, config, arg)?;
    let definition = schema.definition(id);
    let mut form = arg.to_string();

    if value.is_some() {
        if definition.is_void() && !definition.wrapper {
            return Err(ParseError::syntax(
                arg,
                format!("option --{} does not take a value", definition.name),
            ));
        }
    } else if definition.takes_value() {
        let next = rest
            .next()
            .ok_or_else(|| ParseError::MissingValue(arg.to_string()))?;
        form.push(' ');
        form.push_str(&next);
        value = Some(next);
    }

    Ok(ResolvedToken {
        option: id,
        command_line_form: form,
        unconverted_value: value,
    })
}

/// Finds the definition and any value carried by the token itself.
///
/// Booleans always come back with a value (`"1"` or `"0"`) unless one was
/// given inline.
fn resolve(
    schema: &OptionSchema,
    config: &ParserConfig,
    arg: &str,
) -> Result<(OptionId, Option<String>)> {
    let chars: Vec<char> = arg.chars().collect();

    if chars.len() == 2 {
        let id = lookup_abbreviation(schema, config, chars[1], arg)?;
        return Ok((id, boolean_default(schema, id, true)));
    }

    if chars.len() == 3 && chars[1] != '-' && chars[2] == '-' {
        let id = lookup_abbreviation(schema, config, chars[1], arg)?;
        if !schema.definition(id).is_boolean() {
            return Err(ParseError::boolean_syntax(
                arg,
                "trailing '-' is only allowed on boolean options",
            ));
        }
        return Ok((id, Some("0".to_string())));
    }

    let body = if let Some(body) = arg.strip_prefix("--") {
        body
    } else if config.allow_single_dash_long_options {
        &arg[1..]
    } else {
        return Err(ParseError::syntax(arg, "expected -x, -x- or --name"));
    };

    let (name, inline) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (body, None),
    };
    if name.is_empty() {
        return Err(ParseError::syntax(arg, "empty option name"));
    }

    if let Some(id) = lookup_name(schema, config, name) {
        let value = inline.or_else(|| boolean_default(schema, id, true));
        return Ok((id, value));
    }

    let negated = name
        .strip_prefix("no")
        .and_then(|stripped| lookup_name(schema, config, stripped))
        .ok_or_else(|| ParseError::UnrecognizedOption(arg.to_string()))?;
    let definition = schema.definition(negated);
    if !definition.is_boolean() {
        return Err(ParseError::boolean_syntax(
            arg,
            format!("'no' prefix used on non-boolean option --{}", definition.name),
        ));
    }
    if inline.is_some() {
        return Err(ParseError::boolean_syntax(
            arg,
            "unexpected value after negated boolean option",
        ));
    }
    Ok((negated, Some("0".to_string())))
}

fn boolean_default(schema: &OptionSchema, id: OptionId, value: bool) -> Option<String> {
    schema
        .definition(id)
        .is_boolean()
        .then(|| if value { "1" } else { "0" }.to_string())
}

fn visible(schema: &OptionSchema, config: &ParserConfig, id: OptionId) -> bool {
    !(config.ignore_internal_options && schema.definition(id).internal)
}

fn lookup_name(schema: &OptionSchema, config: &ParserConfig, name: &str) -> Option<OptionId> {
    schema
        .lookup_by_name(name)
        .filter(|id| visible(schema, config, *id))
}

fn lookup_abbreviation(
    schema: &OptionSchema,
    config: &ParserConfig,
    abbreviation: char,
    arg: &str,
) -> Result<OptionId> {
    schema
        .lookup_by_abbreviation(abbreviation)
        .filter(|id| visible(schema, config, *id))
        .ok_or_else(|| ParseError::UnrecognizedOption(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use option_precedence_core::{OptionDefinition, ValueType};

    use super::*;
    use crate::{OptionPriority, PriorityCategory};

    fn schema() -> OptionSchema {
        OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("cache").with_abbreviation('c'))
            .with_option(OptionDefinition::single("jobs", ValueType::Number).with_abbreviation('j'))
            .with_option(OptionDefinition::void("fast").with_expansion(["--jobs=8"]))
            .with_option(OptionDefinition::boolean("secret").internal())
    }

    fn parse(args: &[&str], config: &ParserConfig) -> Result<ParsedOccurrence> {
        let schema = schema();
        let mut rest = args[1..].iter().map(|s| s.to_string());
        let token = parse_option(&schema, config, args[0], &mut rest)?;
        Ok(token.into_occurrence(OptionOrigin::direct(
            OptionPriority::lowest(PriorityCategory::CommandLine),
            "test",
        )))
    }

    fn ok(args: &[&str]) -> ParsedOccurrence {
        parse(args, &ParserConfig::default()).unwrap()
    }

    fn err(args: &[&str]) -> ParseError {
        parse(args, &ParserConfig::default()).unwrap_err()
    }

    #[test]
    fn test_long_forms() {
        let occ = ok(&["--jobs=4"]);
        assert_eq!(occ.option(), OptionId(1));
        assert_eq!(occ.unconverted_value(), Some("4"));
        assert_eq!(occ.command_line_form(), "--jobs=4");

        let occ = ok(&["--jobs", "4"]);
        assert_eq!(occ.unconverted_value(), Some("4"));
        assert_eq!(occ.command_line_form(), "--jobs 4");

        let occ = ok(&["--jobs=a=b"]);
        assert_eq!(occ.unconverted_value(), Some("a=b"));
    }

    #[test]
    fn test_boolean_forms() {
        assert_eq!(ok(&["--cache"]).unconverted_value(), Some("1"));
        assert_eq!(ok(&["--nocache"]).unconverted_value(), Some("0"));
        assert_eq!(ok(&["--cache=false"]).unconverted_value(), Some("false"));
        assert_eq!(ok(&["-c"]).unconverted_value(), Some("1"));
        assert_eq!(ok(&["-c-"]).unconverted_value(), Some("0"));
    }

    #[test]
    fn test_abbreviation_takes_next_token() {
        let occ = ok(&["-j", "3"]);
        assert_eq!(occ.unconverted_value(), Some("3"));
        assert_eq!(occ.command_line_form(), "-j 3");
    }

    #[test]
    fn test_boolean_syntax_errors() {
        assert!(matches!(err(&["-j-"]), ParseError::IllegalBooleanSyntax { .. }));
        assert!(matches!(err(&["--nojobs"]), ParseError::IllegalBooleanSyntax { .. }));
        assert!(matches!(err(&["--nocache=1"]), ParseError::IllegalBooleanSyntax { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(err(&["--=3"]), ParseError::InvalidSyntax { .. }));
        assert!(matches!(err(&["-jobs"]), ParseError::InvalidSyntax { .. }));
        assert!(matches!(err(&["--fast=1"]), ParseError::InvalidSyntax { .. }));
        assert_eq!(err(&["--jobs"]), ParseError::MissingValue("--jobs".into()));
    }

    #[test]
    fn test_unknown_and_internal_are_unrecognized() {
        assert_eq!(err(&["--bogus"]), ParseError::UnrecognizedOption("--bogus".into()));
        assert_eq!(err(&["-z"]), ParseError::UnrecognizedOption("-z".into()));
        assert_eq!(err(&["--secret"]), ParseError::UnrecognizedOption("--secret".into()));
        assert_eq!(err(&["--nosecret"]), ParseError::UnrecognizedOption("--nosecret".into()));
    }

    #[test]
    fn test_config_switches() {
        let config = ParserConfig {
            allow_single_dash_long_options: true,
            ignore_internal_options: false,
            ..ParserConfig::default()
        };
        let occ = parse(&["-jobs=2"], &config).unwrap();
        assert_eq!(occ.unconverted_value(), Some("2"));
        assert!(parse(&["--secret"], &config).is_ok());
    }
}
