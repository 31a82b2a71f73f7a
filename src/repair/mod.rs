use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

pub mod detect;
pub mod remote;

pub use detect::WhatlangDetector;
pub use remote::{HttpPunctuator, HttpTranslator};

use crate::utils::truncate_for_log;
use crate::Result;

/// Language every archived transcript ends up in
pub const TARGET_LANGUAGE: &str = "en";

/// Shapes a punctuation model may answer with
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Punctuated {
    Text { text: String },
    Tokens { tokens: Vec<String> },
}

impl Punctuated {
    pub fn into_text(self) -> String {
        match self {
            Punctuated::Text { text } => text,
            Punctuated::Tokens { tokens } => tokens.join(" "),
        }
    }
}

/// Restores punctuation and casing in lowercase caption text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PunctuationRestorer: Send + Sync {
    async fn restore(&self, text: &str) -> Result<Punctuated>;
}

/// Identifies the language of a text as an ISO 639-1 code where one exists
#[cfg_attr(test, mockall::automock)]
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String>;
}

/// Translates text into English
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Why a transcript was not archived
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Restoration lost too much text compared to the raw captions
    Truncated { raw_len: usize, repaired_len: usize },

    /// The captions contained no text at all
    Empty,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Truncated {
                raw_len,
                repaired_len,
            } => write!(
                f,
                "transcript appears truncated ({} of {} characters kept)",
                repaired_len, raw_len
            ),
            RejectReason::Empty => write!(f, "transcript is empty"),
        }
    }
}

/// Result of running the repair chain over one transcript
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    Accepted(String),
    Rejected(RejectReason),
}

/// Remove `<unk>`-style markers the caption recogniser and the punctuation model leave behind
pub fn strip_unknown_tokens(text: &str) -> String {
    static UNKNOWN_TOKEN: OnceLock<Regex> = OnceLock::new();
    let pattern = UNKNOWN_TOKEN.get_or_init(|| {
        Regex::new(r"(?i)[<\[]\s*unk(?:nown)?\s*[>\]]").expect("unknown-token pattern is valid")
    });

    pattern.replace_all(text, "").trim().to_string()
}

/// Restore punctuation, strip artifact tokens, reject truncated output and translate
/// non-English text.
pub struct TextRepairChain {
    restorer: Box<dyn PunctuationRestorer>,
    detector: Box<dyn LanguageDetector>,
    translator: Box<dyn Translator>,
    min_length_ratio: f64,
}

impl TextRepairChain {
    pub fn new(
        restorer: Box<dyn PunctuationRestorer>,
        detector: Box<dyn LanguageDetector>,
        translator: Box<dyn Translator>,
        min_length_ratio: f64,
    ) -> Self {
        Self {
            restorer,
            detector,
            translator,
            min_length_ratio,
        }
    }

    pub async fn repair(&self, raw: &str) -> RepairOutcome {
        if raw.trim().is_empty() {
            return RepairOutcome::Rejected(RejectReason::Empty);
        }

        let repaired = self.restore_punctuation(raw).await;

        let raw_len = raw.chars().count();
        let repaired_len = repaired.chars().count();
        tracing::info!(
            "Raw transcript length: {}, corrected length: {}",
            raw_len,
            repaired_len
        );
        tracing::debug!("Corrected transcript: {}", truncate_for_log(&repaired, 200));

        if (repaired_len as f64) < self.min_length_ratio * raw_len as f64 {
            return RepairOutcome::Rejected(RejectReason::Truncated {
                raw_len,
                repaired_len,
            });
        }

        RepairOutcome::Accepted(self.normalize_language(repaired).await)
    }

    async fn restore_punctuation(&self, raw: &str) -> String {
        match self.restorer.restore(raw).await {
            Ok(punctuated) => strip_unknown_tokens(&punctuated.into_text()),
            Err(e) => {
                tracing::warn!("Punctuation restoration failed, keeping raw text: {:#}", e);
                strip_unknown_tokens(raw)
            }
        }
    }

    async fn normalize_language(&self, text: String) -> String {
        match self.detector.detect(&text) {
            Ok(language) if language == TARGET_LANGUAGE => return text,
            Ok(language) => tracing::info!("Detected language '{}', translating", language),
            Err(e) => tracing::warn!("Language detection failed, translating anyway: {:#}", e),
        }

        match self.translator.translate(&text).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("Error during translation, keeping original text: {:#}", e);
                text
            }
        }
    }
}
