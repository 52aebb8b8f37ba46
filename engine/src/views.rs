//! Read views over a parser's state: effective values, audit trails and the
//! canonical form.

use option_precedence_core::{OptionId, OptionValue};
use serde::ser::{Serialize, SerializeMap, Serializer};
use sha2::{Digest, Sha256};

use crate::aggregator::OptionValueDescription;
use crate::error::Result;
use crate::{OptionsParser, ParsedOccurrence};

/// Every option's effective value, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveValues {
    entries: Vec<(String, OptionValue)>,
}

impl EffectiveValues {
    /// Value of the named option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for EffectiveValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl OptionsParser<'_> {
    /// Effective value of every option, defaults included, in schema order.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`](crate::ParseError::InvalidValue)
    /// if the converter rejects a value.
    pub fn effective_values(&self) -> Result<EffectiveValues> {
        let entries = self
            .schema
            .iter()
            .map(|(id, definition)| Ok((definition.name.clone(), self.effective_value(id)?)))
            .collect::<Result<_>>()?;
        Ok(EffectiveValues { entries })
    }

    /// Effective value of one option.
    ///
    /// # Errors
    ///
    /// [`ParseError::UnrecognizedOption`](crate::ParseError::UnrecognizedOption)
    /// for an unknown name, or a conversion failure.
    pub fn value(&self, name: &str) -> Result<OptionValue> {
        let id = self.lookup(name)?;
        self.effective_value(id)
    }

    /// The aggregator entry of an option that has been set.
    pub fn value_description(&self, name: &str) -> Option<&OptionValueDescription> {
        self.schema
            .lookup_by_name(name)
            .and_then(|id| self.values.get(id))
    }

    /// Occurrences the user supplied, sorted by priority.
    ///
    /// Expansion and implicit-requirement products are excluded, as are
    /// wrapper occurrences (what they unwrapped is listed instead).
    pub fn explicit_occurrences(&self) -> Vec<&ParsedOccurrence> {
        let mut explicit: Vec<_> = self
            .parsed
            .iter()
            .filter(|occ| occ.is_explicit() && !self.schema.definition(occ.option()).wrapper)
            .collect();
        explicit.sort_by_key(|occ| occ.priority());
        explicit
    }

    /// Every recorded occurrence except implicit requirements, sorted by
    /// priority. Ties keep arrival order, so an expansion follows its parent.
    pub fn all_occurrences(&self) -> Vec<&ParsedOccurrence> {
        let mut all: Vec<_> = self.parsed.iter().collect();
        all.sort_by_key(|occ| occ.priority());
        all
    }

    /// Whether `name` was supplied explicitly.
    pub fn contains_explicit_option(&self, name: &str) -> bool {
        let Some(id) = self.schema.lookup_by_name(name) else {
            return false;
        };
        self.explicit_occurrences()
            .iter()
            .any(|occ| occ.option() == id)
    }

    /// Occurrences that reproduce the effective state, in schema order.
    ///
    /// Options carrying implicit requirements come first, so that values
    /// which overrode a requirement are replayed after their parent
    /// re-injects it.
    pub fn canonical_occurrences(&self) -> Vec<&ParsedOccurrence> {
        let (parents, rest): (Vec<_>, Vec<_>) = self
            .schema
            .iter()
            .filter_map(|(id, definition)| {
                self.values.get(id).map(|description| (definition, description))
            })
            .partition(|(definition, _)| definition.has_implicit_requirements());

        parents
            .into_iter()
            .chain(rest)
            .flat_map(|(definition, description)| description.canonical_occurrences(definition))
            .collect()
    }

    /// Minimal token list that re-parses to the same effective values.
    pub fn canonical_form(&self) -> Vec<String> {
        self.canonical_occurrences()
            .into_iter()
            .map(|occ| occ.canonical_form(self.schema.definition(occ.option())))
            .collect()
    }

    /// SHA-256 of the canonical form, hex encoded.
    ///
    /// Tokens are NUL-separated so that `["--a=b c"]` and `["--a=b", "c"]`
    /// differ.
    pub fn canonical_fingerprint(&self) -> String {
        let joined = self.canonical_form().join("\0");
        let hash = Sha256::digest(joined.as_bytes());
        format!("{:x}", hash)
    }

    /// Tokens an expansion option would inject; empty for other options.
    ///
    /// # Errors
    ///
    /// [`ParseError::UnrecognizedOption`](crate::ParseError::UnrecognizedOption)
    /// for an unknown name.
    pub fn expansion_preview(&self, name: &str) -> Result<Vec<String>> {
        let id: OptionId = self.lookup(name)?;
        Ok(self.schema.evaluated_expansion(id))
    }

    /// Deprecation and conflict warnings, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Residue of every successful call, in order.
    pub fn residue(&self) -> &[String] {
        &self.residue
    }
}

#[cfg(test)]
mod tests {
    use option_precedence_core::{OptionDefinition, OptionSchema, ValueType};

    use super::*;
    use crate::PriorityCategory;

    fn schema() -> OptionSchema {
        OptionSchema::new("t")
            .with_option(OptionDefinition::boolean("verbose").with_abbreviation('v'))
            .with_option(OptionDefinition::single("level", ValueType::Number).with_default("0"))
            .with_option(OptionDefinition::repeated("tag", ValueType::String).allow_multiple())
            .with_option(OptionDefinition::void("loud").with_expansion(["--verbose", "--level=5"]))
            .with_option(
                OptionDefinition::single("mode", ValueType::String)
                    .with_implicit_requirements(["--tag=implied"]),
            )
    }

    #[test]
    fn test_effective_values_in_schema_order() {
        let schema = schema();
        let mut parser = OptionsParser::new(&schema);
        parser
            .parse_args(PriorityCategory::CommandLine, "cmd", ["--tag=b", "-v", "--tag=a"])
            .unwrap();

        let values = parser.effective_values().unwrap();
        let names: Vec<&str> = values.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["verbose", "level", "tag", "loud", "mode"]);
        assert_eq!(values.get("verbose"), Some(&OptionValue::Bool(true)));
        assert_eq!(values.get("level"), Some(&OptionValue::Int(0)));
        assert_eq!(
            values.get("tag"),
            Some(&OptionValue::List(vec![
                OptionValue::Str("b".into()),
                OptionValue::Str("a".into()),
            ]))
        );

        let json = serde_json::to_string(&values).unwrap();
        assert!(json.starts_with(r#"{"verbose":true,"level":0,"tag":["b","a"]"#));
    }

    #[test]
    fn test_implicit_requirement_hidden_from_explicit_view() {
        let schema = schema();
        let mut parser = OptionsParser::new(&schema);
        parser
            .parse_args(PriorityCategory::CommandLine, "cmd", ["--mode=fast"])
            .unwrap();

        assert!(parser.contains_explicit_option("mode"));
        assert!(!parser.contains_explicit_option("tag"));
        assert_eq!(parser.all_occurrences().len(), 1);
        assert_eq!(
            parser.value("tag").unwrap(),
            OptionValue::List(vec![OptionValue::Str("implied".into())])
        );
        assert_eq!(parser.canonical_form(), vec!["--mode=fast".to_string()]);
    }

    #[test]
    fn test_expansion_in_audit_trail_only() {
        let schema = schema();
        let mut parser = OptionsParser::new(&schema);
        parser
            .parse_args(PriorityCategory::CommandLine, "cmd", ["--loud"])
            .unwrap();

        let explicit: Vec<&str> = parser
            .explicit_occurrences()
            .iter()
            .map(|occ| occ.command_line_form())
            .collect();
        assert_eq!(explicit, vec!["--loud"]);
        let all: Vec<&str> = parser
            .all_occurrences()
            .iter()
            .map(|occ| occ.command_line_form())
            .collect();
        assert_eq!(all, vec!["--loud", "--verbose", "--level=5"]);
        assert_eq!(
            parser.canonical_form(),
            vec!["--verbose".to_string(), "--level=5".to_string()]
        );
    }

    #[test]
    fn test_fingerprint_tracks_canonical_form() {
        let schema = schema();
        let mut a = OptionsParser::new(&schema);
        a.parse_args(PriorityCategory::CommandLine, "cmd", ["--level=2", "-v"]).unwrap();
        let mut b = OptionsParser::new(&schema);
        b.parse_args(PriorityCategory::CommandLine, "cmd", ["--verbose", "--level", "2"]).unwrap();
        let mut c = OptionsParser::new(&schema);
        c.parse_args(PriorityCategory::CommandLine, "cmd", ["--level=3"]).unwrap();

        assert_eq!(a.canonical_fingerprint(), b.canonical_fingerprint());
        assert_ne!(a.canonical_fingerprint(), c.canonical_fingerprint());
        assert_eq!(a.canonical_fingerprint().len(), 64);
    }

    #[test]
    fn test_expansion_preview() {
        let schema = schema();
        let parser = OptionsParser::new(&schema);
        assert_eq!(
            parser.expansion_preview("loud").unwrap(),
            vec!["--verbose".to_string(), "--level=5".to_string()]
        );
        assert!(parser.expansion_preview("level").unwrap().is_empty());
        assert!(parser.expansion_preview("missing").is_err());
    }
}
