//! Naming configuration
//!
//! Every policy table the passes consult lives here: attribute alias lists,
//! the protected-net marker, the base-label ordering, the letter-code rule
//! table and the terminal prefixes used when the host cannot answer the
//! terminal predicates. All fields have defaults, so a config file only
//! needs to name what it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::NamingError;
use crate::labeling::BaseLabelOrder;

/// Maps a case-insensitive substring of a device name to a letter code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterCodeRule {
    pub pattern: String,
    pub code: String,
}

impl LetterCodeRule {
    pub fn new(pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            code: code.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        !self.pattern.is_empty() && name.to_uppercase().contains(&self.pattern.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Net segment attribute names for the wire number, tried in order
    pub wire_number_attributes: Vec<String>,
    /// Net attribute marking a protected net
    pub fix_wire_name_attribute: String,
    pub base_label_order: BaseLabelOrder,
    /// Placeholder used when no grid position or location is known
    pub unknown_token: String,
    /// Device component attributes holding the letter code, tried in order
    pub letter_code_attributes: Vec<String>,
    /// Name heuristics applied when no letter code attribute is set
    pub letter_code_rules: Vec<LetterCodeRule>,
    pub default_letter_code: String,
    /// Name prefixes identifying terminals when the host has no terminal predicates
    pub terminal_prefixes: Vec<String>,
    /// Digits in sequential cable numbers (`W001`)
    pub cable_number_width: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            wire_number_attributes: vec![
                "Wire number".to_string(),
                "WireNumber".to_string(),
                "Wire_number".to_string(),
            ],
            fix_wire_name_attribute: "FixWireName".to_string(),
            base_label_order: BaseLabelOrder::Lexicographic,
            unknown_token: "UNKNOWN".to_string(),
            letter_code_attributes: vec![
                "DeviceLetterCode".to_string(),
                "Device Letter Code".to_string(),
                "LetterCode".to_string(),
            ],
            letter_code_rules: default_letter_code_rules(),
            default_letter_code: "X".to_string(),
            terminal_prefixes: vec![
                "TERM".to_string(),
                "TB".to_string(),
                "XT".to_string(),
                "T".to_string(),
                "X".to_string(),
            ],
            cable_number_width: 3,
        }
    }
}

fn default_letter_code_rules() -> Vec<LetterCodeRule> {
    vec![
        LetterCodeRule::new("DISCONNECT", "Q"),
        LetterCodeRule::new("BREAKER", "Q"),
        LetterCodeRule::new("MOTOR", "M"),
        LetterCodeRule::new("CONTACTOR", "K"),
        LetterCodeRule::new("RELAY", "K"),
        LetterCodeRule::new("TIMER", "K"),
        LetterCodeRule::new("OVERLOAD", "F"),
        LetterCodeRule::new("FUSE", "F"),
        LetterCodeRule::new("TRANSFORMER", "T"),
        LetterCodeRule::new("POWER SUPPLY", "G"),
        LetterCodeRule::new("PLC", "A"),
        LetterCodeRule::new("PUSHBUTTON", "S"),
        LetterCodeRule::new("SWITCH", "S"),
        LetterCodeRule::new("SENSOR", "B"),
        LetterCodeRule::new("LAMP", "P"),
        LetterCodeRule::new("CABLE", "W"),
    ]
}

impl NamingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, NamingError> {
        let config: NamingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, NamingError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!("Loaded naming configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, NamingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), NamingError> {
        if self.wire_number_attributes.iter().all(|a| a.trim().is_empty()) {
            return Err(NamingError::Config(
                "wire_number_attributes must name at least one attribute".to_string(),
            ));
        }
        if self.default_letter_code.trim().is_empty() {
            return Err(NamingError::Config(
                "default_letter_code must not be empty".to_string(),
            ));
        }
        if self.unknown_token.is_empty() {
            return Err(NamingError::Config("unknown_token must not be empty".to_string()));
        }
        if let Some(rule) = self.letter_code_rules.iter().find(|r| r.code.trim().is_empty()) {
            return Err(NamingError::Config(format!(
                "letter code rule '{}' has an empty code",
                rule.pattern
            )));
        }
        Ok(())
    }

    /// First rule whose pattern occurs in `name`
    pub fn rule_letter_code(&self, name: &str) -> Option<&str> {
        self.letter_code_rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| rule.code.as_str())
    }

    /// Case-insensitive prefix match against the terminal prefixes
    pub fn has_terminal_prefix(&self, name: &str) -> bool {
        let upper = name.trim().to_uppercase();
        self.terminal_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| upper.starts_with(&p.to_uppercase()))
    }

    /// Interpret a protected-net marker value
    pub fn is_truthy_flag(value: &str) -> bool {
        !matches!(
            value.trim().to_lowercase().as_str(),
            "" | "0" | "false" | "no"
        )
    }
}
