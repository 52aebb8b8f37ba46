//! Parser behaviour switches.

use serde::{Deserialize, Serialize};

/// Settings controlling how tokens are interpreted.
///
/// # Examples
///
/// ```
/// use option_precedence_engine::ParserConfig;
///
/// let config = ParserConfig::default();
/// assert!(!config.allow_single_dash_long_options);
/// assert!(config.allow_residue);
/// assert!(config.ignore_internal_options);
///
/// let strict: ParserConfig = serde_yaml::from_str("allow_residue: false").unwrap();
/// assert!(!strict.allow_residue);
/// assert!(strict.ignore_internal_options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Accept `-name[=value]` as a long option.
    pub allow_single_dash_long_options: bool,
    /// Return non-option tokens to the caller; when off they are an error.
    pub allow_residue: bool,
    /// Report internal options as unrecognized.
    pub ignore_internal_options: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allow_single_dash_long_options: false,
            allow_residue: true,
            ignore_internal_options: true,
        }
    }
}
