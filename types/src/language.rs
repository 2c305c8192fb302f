//! Validated language tags.
//!
//! A [`LanguageTag`] can only be obtained through [`LanguageSet::tag`], so
//! holding one is proof the server supports it. The set is built from the
//! server's `v2/languages` response and cached by the client.

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// One entry of the server's supported-language list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[serde(default)]
    pub name: String,
    pub code: String,
    pub long_code: String,
}

/// The tag was not in the server's supported-language list.
#[derive(Debug, Clone, Error)]
#[error("language '{tag}' is not supported by the server")]
pub struct UnsupportedLanguage {
    pub tag: String,
}

/// The set of language tags a server reports supporting.
///
/// Contains both the short `code` and the `longCode` of every reported
/// language, plus `"auto"` (server-side detection).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSet {
    tags: BTreeSet<String>,
}

impl LanguageSet {
    #[must_use]
    pub fn new(languages: &[Language]) -> Self {
        let mut tags = BTreeSet::new();
        for lang in languages {
            tags.insert(lang.code.clone());
            tags.insert(lang.long_code.clone());
        }
        tags.insert("auto".to_string());
        Self { tags }
    }

    /// Validate `tag` against the set, failing fast on unknown values.
    pub fn tag(&self, tag: &str) -> Result<LanguageTag, UnsupportedLanguage> {
        if self.tags.contains(tag) {
            Ok(LanguageTag(tag.to_string()))
        } else {
            Err(UnsupportedLanguage {
                tag: tag.to_string(),
            })
        }
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A language tag validated against a server's supported set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LanguageTag(String);

impl LanguageTag {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
