//! Language codes understood by the speech and translation backends

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Language of an utterance or recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    English,
    Twi,
    Ga,
    Ewe,
    Fante,
    Dagbani,
    Gurene,
    Yoruba,
    Kikuyu,
    Luo,
    Kimeru,
}

impl Language {
    /// Every supported language, in display order
    pub const ALL: [Self; 11] = [
        Self::English,
        Self::Twi,
        Self::Ga,
        Self::Ewe,
        Self::Fante,
        Self::Dagbani,
        Self::Gurene,
        Self::Yoruba,
        Self::Kikuyu,
        Self::Luo,
        Self::Kimeru,
    ];

    /// Backend language code (e.g. `tw`)
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Twi => "tw",
            Self::Ga => "gaa",
            Self::Ewe => "ee",
            Self::Fante => "fat",
            Self::Dagbani => "dag",
            Self::Gurene => "gur",
            Self::Yoruba => "yo",
            Self::Kikuyu => "ki",
            Self::Luo => "luo",
            Self::Kimeru => "mer",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Twi => "Twi",
            Self::Ga => "Ga",
            Self::Ewe => "Ewe",
            Self::Fante => "Fante",
            Self::Dagbani => "Dagbani",
            Self::Gurene => "Gurene",
            Self::Yoruba => "Yoruba",
            Self::Kikuyu => "Kikuyu",
            Self::Luo => "Luo",
            Self::Kimeru => "Kimeru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == wanted || lang.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::Language(s.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}
