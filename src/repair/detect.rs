use whatlang::Lang;

use super::LanguageDetector;
use crate::{HarvestError, Result};

/// Offline language detection with `whatlang`
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String> {
        let info = whatlang::detect(text).ok_or(HarvestError::UndetectedLanguage)?;
        tracing::debug!(
            "Detected {} with confidence {:.2}",
            info.lang().code(),
            info.confidence()
        );
        Ok(iso_639_1(info.lang()).to_string())
    }
}

/// Two-letter code for the languages translators know by it, the ISO 639-3 code otherwise
fn iso_639_1(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Spa => "es",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Pol => "pl",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Vie => "vi",
        Lang::Ind => "id",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Fin => "fi",
        Lang::Ces => "cs",
        Lang::Ell => "el",
        Lang::Heb => "he",
        other => other.code(),
    }
}
