//! Pipeline configuration: language-mode pair and diagnostic-capture flags
//! handed to the compiler for one measured invocation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// ECMAScript language levels understood by the compiler collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LanguageMode {
    Ecmascript3,
    Ecmascript5,
    Ecmascript6,
}

impl LanguageMode {
    /// Flag value as spelled on the compiler command line.
    pub fn as_flag(&self) -> &'static str {
        match self {
            LanguageMode::Ecmascript3 => "ECMASCRIPT3",
            LanguageMode::Ecmascript5 => "ECMASCRIPT5",
            LanguageMode::Ecmascript6 => "ECMASCRIPT6",
        }
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Which of the two measured configurations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// ES5 input, parse and check only.
    Legacy,
    /// ES6 input transpiled down to ES5.
    ModernToLegacy,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Legacy, Mode::ModernToLegacy];

    /// Name of the single source unit wrapping the fixture for this mode.
    pub fn input_name(&self) -> &'static str {
        match self {
            Mode::Legacy => "js5script.js",
            Mode::ModernToLegacy => "es6script.js",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Legacy => "legacy",
            Mode::ModernToLegacy => "modern",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable options for one compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Incremental/IDE analysis mode.
    pub ide_mode: bool,
    pub record_function_information: bool,
    /// Keep JSDoc description text.
    pub parse_jsdoc_documentation: bool,
    pub preserve_jsdoc_whitespace: bool,
    pub language_in: LanguageMode,
    /// `None` means parse only, no transpilation target.
    pub language_out: Option<LanguageMode>,
}

/// Build the options for `mode`.
pub fn build_config(mode: Mode) -> PipelineConfig {
    let (language_in, language_out) = match mode {
        Mode::Legacy => (LanguageMode::Ecmascript5, None),
        Mode::ModernToLegacy => (LanguageMode::Ecmascript6, Some(LanguageMode::Ecmascript5)),
    };
    PipelineConfig {
        ide_mode: true,
        record_function_information: true,
        parse_jsdoc_documentation: true,
        preserve_jsdoc_whitespace: true,
        language_in,
        language_out,
    }
}
