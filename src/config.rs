use serde::{Deserialize, Serialize};

/// Lexical conventions of the assembly source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsmConfig {
    /// A token starting with this discards the rest of the line.
    pub comment_delimiter: String,
    /// First token of a define line, matched case-insensitively.
    pub define_keyword: String,
    /// Prefix of label declarations and references.
    pub label_prefix: String,
    /// Separates a label reference from its loading register (`.loop$r1`).
    pub loading_register_separator: char,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            comment_delimiter: "#".into(),
            define_keyword: "`define".into(),
            label_prefix: ".".into(),
            loading_register_separator: '$',
        }
    }
}
