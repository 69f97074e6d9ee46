//! Machine translation between supported languages

use async_trait::async_trait;

use super::language::Language;
use crate::Result;

/// A text translation backend
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `text` from `source` into `target`
    ///
    /// # Errors
    ///
    /// Returns error on a non-2xx response or transport failure
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

/// Language pair tag in the `<src>-<tgt>` form the translation backend expects
#[must_use]
pub fn language_pair(source: Language, target: Language) -> String {
    format!("{}-{}", source.code(), target.code())
}
