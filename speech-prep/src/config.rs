//! speech-prep configuration: scoring weights, cleaning rules, chunk limits
//! and collaborator commands.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::text::RuleName;
use crate::text::chunker::{DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS};
use crate::text::sentences::DEFAULT_ABBREVIATIONS;

// Default values for quality scoring
const DEFAULT_WORD_LENGTH_WEIGHT: f64 = 0.25;
const DEFAULT_ALPHA_RATIO_WEIGHT: f64 = 0.5;
const DEFAULT_SPACING_WEIGHT: f64 = 0.25;
const DEFAULT_CONTROL_PENALTY_WEIGHT: f64 = 0.5;
const DEFAULT_QUALITY_THRESHOLD: f64 = 0.75;

/// Weights and thresholds for extraction quality scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the mean-word-length component
    pub word_length_weight: f64,

    /// Weight of the alphabetic-character ratio
    pub alpha_ratio_weight: f64,

    /// Weight of inter-word spacing regularity
    pub spacing_weight: f64,

    /// Penalty weight for control/replacement character density
    pub control_penalty_weight: f64,

    /// Lower bound of the mean word length considered healthy
    pub ideal_word_length_min: f64,

    /// Upper bound of the mean word length considered healthy
    pub ideal_word_length_max: f64,

    /// Best native score below this requests OCR (0.0-1.0)
    pub quality_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            word_length_weight: DEFAULT_WORD_LENGTH_WEIGHT,
            alpha_ratio_weight: DEFAULT_ALPHA_RATIO_WEIGHT,
            spacing_weight: DEFAULT_SPACING_WEIGHT,
            control_penalty_weight: DEFAULT_CONTROL_PENALTY_WEIGHT,
            ideal_word_length_min: 3.0,
            ideal_word_length_max: 8.0,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Rules to run. They always run in registration order.
    pub enabled_rules: Vec<RuleName>,

    /// Minimum number of occurrences before a short line counts as a running header
    pub header_repetition_threshold: usize,

    /// Longest line (in chars) that can be a running header
    pub header_max_chars: usize,

    /// Lines on either side of a line in which its repetitions are counted
    pub header_window_lines: usize,

    /// Fraction of non-whitespace input that must survive cleaning
    pub min_retained_ratio: f64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            enabled_rules: RuleName::ALL.to_vec(),
            header_repetition_threshold: 3,
            header_max_chars: 80,
            header_window_lines: 300,
            min_retained_ratio: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters
    pub max_chars: usize,

    /// Chunks shorter than this are merged or rebalanced when possible
    pub min_chars: usize,

    /// Tokens whose trailing period never ends a sentence
    pub abbreviations: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            min_chars: DEFAULT_MIN_CHARS,
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// OCR collaborator command. OCR is disabled while `program` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    pub args: Vec<String>,

    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: 300,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A command-backed extractor: document bytes on stdin, text on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub label: String,

    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_extractor_timeout")]
    pub timeout_secs: u64,
}

fn default_extractor_timeout() -> u64 {
    60
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_extractors() -> Vec<ExtractorConfig> {
    vec![
        ExtractorConfig {
            label: "pdftotext".to_string(),
            program: "pdftotext".to_string(),
            args: vec!["-layout".into(), "-".into(), "-".into()],
            timeout_secs: default_extractor_timeout(),
        },
        ExtractorConfig {
            label: "pdftotext-raw".to_string(),
            program: "pdftotext".to_string(),
            args: vec!["-raw".into(), "-".into(), "-".into()],
            timeout_secs: default_extractor_timeout(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub cleaner: CleanerConfig,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    /// PDF extractors, in preference order (earlier wins ties)
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorConfig>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            cleaner: CleanerConfig::default(),
            chunker: ChunkerConfig::default(),
            ocr: OcrConfig::default(),
            extractors: default_extractors(),
        }
    }
}

impl PrepConfig {
    /// Get the config file path: ~/.config/cli-programs/speech-prep.toml
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| ConfigError::MissingHome)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("speech-prep.toml"))
    }

    /// Load config from the default location, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: PrepConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scoring;
        let weights = [
            s.word_length_weight,
            s.alpha_ratio_weight,
            s.spacing_weight,
            s.control_penalty_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&s.quality_threshold) {
            return Err(ConfigError::Invalid(format!(
                "quality_threshold must be within 0.0-1.0, got {}",
                s.quality_threshold
            )));
        }
        if s.ideal_word_length_min <= 0.0 || s.ideal_word_length_min > s.ideal_word_length_max {
            return Err(ConfigError::Invalid(
                "ideal word length range must be positive and ordered".into(),
            ));
        }
        if self.chunker.max_chars == 0 {
            return Err(ConfigError::Invalid("max_chars must be positive".into()));
        }
        if self.chunker.min_chars > self.chunker.max_chars {
            return Err(ConfigError::Invalid(format!(
                "min_chars ({}) exceeds max_chars ({})",
                self.chunker.min_chars, self.chunker.max_chars
            )));
        }
        if self.cleaner.header_repetition_threshold < 2 {
            return Err(ConfigError::Invalid(
                "header_repetition_threshold must be at least 2".into(),
            ));
        }
        if self.cleaner.header_window_lines == 0 {
            return Err(ConfigError::Invalid(
                "header_window_lines must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cleaner.min_retained_ratio) {
            return Err(ConfigError::Invalid(
                "min_retained_ratio must be within 0.0-1.0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrepConfig::default();
        assert_eq!(config.chunker.max_chars, 2000);
        assert_eq!(config.chunker.min_chars, 50);
        assert_eq!(config.scoring.quality_threshold, 0.75);
        assert_eq!(config.cleaner.enabled_rules, RuleName::ALL.to_vec());
        assert!(config.ocr.program.is_none());
        assert_eq!(config.extractors.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = PrepConfig::config_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.ends_with("cli-programs/speech-prep.toml"));
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[scoring]
alpha_ratio_weight = 0.6
quality_threshold = 0.5

[cleaner]
enabled_rules = ["dehyphenate", "canonicalize_whitespace"]
header_repetition_threshold = 4
header_window_lines = 120

[chunker]
max_chars = 500
min_chars = 40
abbreviations = ["Dr.", "Capt."]

[ocr]
program = "ocr-to-text"
args = ["--lang", "eng"]
timeout_secs = 30

[[extractors]]
label = "mutool"
program = "mutool"
args = ["draw", "-F", "txt", "-"]
"#;
        let config: PrepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scoring.alpha_ratio_weight, 0.6);
        assert_eq!(config.scoring.spacing_weight, 0.25);
        assert_eq!(config.scoring.quality_threshold, 0.5);
        assert_eq!(
            config.cleaner.enabled_rules,
            vec![RuleName::Dehyphenate, RuleName::CanonicalizeWhitespace]
        );
        assert_eq!(config.cleaner.header_repetition_threshold, 4);
        assert_eq!(config.cleaner.header_max_chars, 80);
        assert_eq!(config.cleaner.header_window_lines, 120);
        assert_eq!(config.chunker.max_chars, 500);
        assert_eq!(config.chunker.abbreviations, vec!["Dr.", "Capt."]);
        assert_eq!(config.ocr.program.as_deref(), Some("ocr-to-text"));
        assert_eq!(config.ocr.timeout(), Duration::from_secs(30));
        assert_eq!(config.extractors.len(), 1);
        assert_eq!(config.extractors[0].label, "mutool");
        assert_eq!(config.extractors[0].timeout_secs, 60);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: PrepConfig = toml::from_str("").unwrap();
        assert_eq!(config, PrepConfig::default());
    }

    #[test]
    fn test_unknown_rule_rejected() {
        let toml_str = r#"
[cleaner]
enabled_rules = ["make_it_pretty"]
"#;
        assert!(toml::from_str::<PrepConfig>(toml_str).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = PrepConfig::default();
        config.chunker.min_chars = 600;
        config.chunker.max_chars = 500;
        assert!(config.validate().is_err());

        let mut config = PrepConfig::default();
        config.scoring.quality_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PrepConfig::default();
        config.scoring.alpha_ratio_weight = -0.1;
        assert!(config.validate().is_err());

        let mut config = PrepConfig::default();
        config.cleaner.header_window_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("speech-prep.toml");

        let mut config = PrepConfig::default();
        config.chunker.max_chars = 750;
        config.ocr.program = Some("ocr-to-text".to_string());
        config.save_to(&path).unwrap();

        let loaded = PrepConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PrepConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, PrepConfig::default());
    }
}
