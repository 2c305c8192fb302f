//! Wire model for `v2/check` responses.
//!
//! Field names follow the server's JSON. Unknown fields are ignored and
//! optional fields default, so a newer server never breaks deserialization.

use serde::Deserialize;

/// Top-level body of a `v2/check` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// One flagged span of text with suggested replacements.
///
/// Immutable once parsed from a response. Offsets and lengths count
/// characters, matching the server's code-point semantics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Character offset of the flagged span in the checked text.
    pub offset: usize,
    /// Character length of the flagged span.
    #[serde(alias = "errorLength")]
    pub length: usize,
    /// Human-readable description of the problem.
    pub message: String,
    #[serde(default)]
    pub short_message: String,
    /// Suggested replacements, best candidate first.
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub context: Option<Context>,
    #[serde(default)]
    pub sentence: String,
}

impl Match {
    /// The identifier of the rule that produced this match, if reported.
    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.id.as_str())
    }

    /// The best replacement candidate, if any.
    #[must_use]
    pub fn first_replacement(&self) -> Option<&str> {
        self.replacements.first().map(|r| r.value.as_str())
    }
}

/// A single replacement candidate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replacement {
    pub value: String,
}

/// The rule that produced a match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The flagged span in its surrounding text, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Context {
    pub text: String,
    pub offset: usize,
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_match() {
        let m: Match = serde_json::from_value(serde_json::json!({
            "offset": 0,
            "length": 3,
            "message": "Possible spelling mistake found.",
            "shortMessage": "Spelling mistake",
            "replacements": [{"value": "The"}, {"value": "Tech"}],
            "rule": {
                "id": "MORFOLOGIK_RULE_EN_US",
                "description": "Possible spelling mistake",
                "category": {"id": "TYPOS", "name": "Possible Typo"}
            },
            "context": {"text": "Teh cat sat.", "offset": 0, "length": 3},
            "sentence": "Teh cat sat."
        }))
        .unwrap();

        assert_eq!(m.offset, 0);
        assert_eq!(m.length, 3);
        assert_eq!(m.first_replacement(), Some("The"));
        assert_eq!(m.rule_id(), Some("MORFOLOGIK_RULE_EN_US"));
        assert_eq!(m.rule.unwrap().category.unwrap().id, "TYPOS");
    }

    #[test]
    fn accepts_error_length_alias() {
        let m: Match = serde_json::from_value(serde_json::json!({
            "offset": 4,
            "errorLength": 2,
            "message": "msg"
        }))
        .unwrap();
        assert_eq!(m.length, 2);
    }

    #[test]
    fn missing_optional_fields_default() {
        let m: Match = serde_json::from_value(serde_json::json!({
            "offset": 0,
            "length": 1,
            "message": "msg"
        }))
        .unwrap();
        assert!(m.replacements.is_empty());
        assert!(m.rule.is_none());
        assert!(m.context.is_none());
        assert!(m.sentence.is_empty());
        assert_eq!(m.first_replacement(), None);
    }

    #[test]
    fn unknown_fields_ignored() {
        let m: Match = serde_json::from_value(serde_json::json!({
            "offset": 0,
            "length": 1,
            "message": "msg",
            "ignoreForIncompleteSentence": true,
            "contextForSureMatch": 3
        }))
        .unwrap();
        assert_eq!(m.offset, 0);
    }
}
