//! Per-call check configuration.
//!
//! [`CheckOptions`] is an immutable value built by the caller and passed
//! into each check; rebuild it when settings change. Rule and category
//! sets are ordered so the derived query parameters are deterministic.

use std::collections::BTreeSet;

use crate::language::LanguageTag;

/// Category id of the server's spell-checking rules.
const SPELLCHECK_CATEGORY: &str = "TYPOS";

/// Options applied to a single `v2/check` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    language: LanguageTag,
    mother_tongue: Option<LanguageTag>,
    disabled_rules: BTreeSet<String>,
    enabled_rules: BTreeSet<String>,
    enabled_only: bool,
    disabled_categories: BTreeSet<String>,
    enabled_categories: BTreeSet<String>,
    preferred_variants: BTreeSet<String>,
}

impl CheckOptions {
    #[must_use]
    pub fn new(language: LanguageTag) -> Self {
        Self {
            language,
            mother_tongue: None,
            disabled_rules: BTreeSet::new(),
            enabled_rules: BTreeSet::new(),
            enabled_only: false,
            disabled_categories: BTreeSet::new(),
            enabled_categories: BTreeSet::new(),
            preferred_variants: BTreeSet::new(),
        }
    }

    /// The mother tongue is also used as a source language for checking
    /// bilingual texts.
    #[must_use]
    pub fn with_mother_tongue(mut self, tongue: LanguageTag) -> Self {
        self.mother_tongue = Some(tongue);
        self
    }

    #[must_use]
    pub fn disable_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn enable_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Only apply explicitly enabled rules and categories.
    #[must_use]
    pub fn enabled_only(mut self) -> Self {
        self.enabled_only = true;
        self
    }

    #[must_use]
    pub fn disable_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_categories
            .extend(categories.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn enable_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_categories
            .extend(categories.into_iter().map(Into::into));
        self
    }

    /// Preferred language variants when checking with `language=auto`.
    #[must_use]
    pub fn prefer_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_variants
            .extend(variants.into_iter().map(Into::into));
        self
    }

    /// Remove the spell-checking category from the disabled set.
    #[must_use]
    pub fn enable_spellchecking(mut self) -> Self {
        self.disabled_categories.remove(SPELLCHECK_CATEGORY);
        self
    }

    /// Disable the server's spell-checking rules.
    #[must_use]
    pub fn disable_spellchecking(mut self) -> Self {
        self.disabled_categories.insert(SPELLCHECK_CATEGORY.to_string());
        self
    }

    #[must_use]
    pub fn language(&self) -> &LanguageTag {
        &self.language
    }

    /// Query parameters for a `v2/check` request on `text`.
    ///
    /// Empty sets are omitted entirely, matching what the server expects.
    #[must_use]
    pub fn query_params(&self, text: &str) -> Vec<(&'static str, String)> {
        fn join(set: &BTreeSet<String>) -> String {
            set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        }

        let mut params = vec![
            ("language", self.language.to_string()),
            ("text", text.to_string()),
        ];
        if let Some(tongue) = &self.mother_tongue {
            params.push(("motherTongue", tongue.to_string()));
        }
        if !self.disabled_rules.is_empty() {
            params.push(("disabledRules", join(&self.disabled_rules)));
        }
        if !self.enabled_rules.is_empty() {
            params.push(("enabledRules", join(&self.enabled_rules)));
        }
        if self.enabled_only {
            params.push(("enabledOnly", "true".to_string()));
        }
        if !self.disabled_categories.is_empty() {
            params.push(("disabledCategories", join(&self.disabled_categories)));
        }
        if !self.enabled_categories.is_empty() {
            params.push(("enabledCategories", join(&self.enabled_categories)));
        }
        if !self.preferred_variants.is_empty() {
            params.push(("preferredVariants", join(&self.preferred_variants)));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Language, LanguageSet};

    fn tag(s: &str) -> LanguageTag {
        LanguageSet::new(&[Language {
            name: String::new(),
            code: "en".to_string(),
            long_code: "en-US".to_string(),
        }])
        .tag(s)
        .unwrap()
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn minimal_params() {
        let params = CheckOptions::new(tag("en-US")).query_params("some text");
        assert_eq!(param(&params, "language"), Some("en-US"));
        assert_eq!(param(&params, "text"), Some("some text"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn sets_join_comma_separated_and_sorted() {
        let params = CheckOptions::new(tag("en-US"))
            .disable_rules(["UPPERCASE_SENTENCE_START", "MORFOLOGIK_RULE_EN_US"])
            .query_params("t");
        assert_eq!(
            param(&params, "disabledRules"),
            Some("MORFOLOGIK_RULE_EN_US,UPPERCASE_SENTENCE_START")
        );
    }

    #[test]
    fn enabled_only_flag_emitted_when_set() {
        let base = CheckOptions::new(tag("en-US"));
        assert_eq!(param(&base.clone().query_params("t"), "enabledOnly"), None);
        let params = base.enabled_only().query_params("t");
        assert_eq!(param(&params, "enabledOnly"), Some("true"));
    }

    #[test]
    fn spellchecking_toggles_typos_category() {
        let opts = CheckOptions::new(tag("en-US")).disable_spellchecking();
        assert_eq!(
            param(&opts.clone().query_params("t"), "disabledCategories"),
            Some("TYPOS")
        );

        let params = opts.enable_spellchecking().query_params("t");
        assert_eq!(param(&params, "disabledCategories"), None);
    }

    #[test]
    fn mother_tongue_and_variants() {
        let params = CheckOptions::new(tag("auto"))
            .with_mother_tongue(tag("en"))
            .prefer_variants(["en-US"])
            .query_params("t");
        assert_eq!(param(&params, "motherTongue"), Some("en"));
        assert_eq!(param(&params, "preferredVariants"), Some("en-US"));
    }
}
