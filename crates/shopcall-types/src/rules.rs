use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Reply sent when no free-text rule matches.
pub const FALLBACK_RESPONSE: &str = "抱歉，我不太明白您的問題！";

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("rule table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule pattern {pattern:?} does not compile: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}

/// A free-text rule. Rules are matched in declaration order and the first
/// match wins; declaration order is the only tie-break.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: Regex,
    pub response: String,
}

impl PatternRule {
    pub fn new(pattern: &str, response: impl Into<String>) -> Result<Self, RuleTableError> {
        let pattern = Regex::new(pattern).map_err(|source| RuleTableError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern,
            response: response.into(),
        })
    }
}

/// A quick-reply button: the stored `pattern` field is the exact label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuickReply {
    #[serde(rename = "pattern")]
    pub label: String,
    pub response: String,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            response: response.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<RawRule>,
    #[serde(default)]
    quick_replies: Vec<QuickReply>,
    #[serde(default)]
    fallback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    pattern: String,
    response: String,
}

/// The two canned-response tables: an ordered regex list for free text and
/// an exact-label lookup for quick replies. Loaded once, read-only at
/// runtime.
#[derive(Debug, Clone)]
pub struct ResponseRules {
    free_text: Vec<PatternRule>,
    quick: Vec<QuickReply>,
    fallback: String,
}

impl ResponseRules {
    pub fn new(
        free_text: Vec<PatternRule>,
        quick: Vec<QuickReply>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            free_text,
            quick,
            fallback: fallback.into(),
        }
    }

    /// The tables shipped with the widget.
    pub fn builtin() -> Self {
        let free_text = vec![
            PatternRule::new(r"訂單編號[\s\S]*", "訂單編號是20240823153700"),
            PatternRule::new(r"營業時間[\s\S]*", "我們的營業時間為每天9:00-18:00"),
            PatternRule::new(r"聯絡方式[\s\S]*", "您好！可以透過客服電話或電子郵件聯絡我們喔～"),
        ]
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("builtin rule patterns compile");

        let quick = vec![
            QuickReply::new("配送問題", "配送中的訂單可以在「訂單查詢」追蹤最新狀態喔！"),
            QuickReply::new("運送時間", "一般商品約 1-3 個工作天送達，偏遠地區另計～"),
            QuickReply::new("聯絡方式", "您好！可以透過客服電話或電子郵件聯絡我們喔～"),
        ];

        Self::new(free_text, quick, FALLBACK_RESPONSE)
    }

    /// Load both tables from the authoring console's JSON export. Missing
    /// sections fall back to empty tables / the builtin fallback string.
    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        let file: RulesFile = serde_json::from_str(json)?;
        let free_text = file
            .rules
            .into_iter()
            .map(|r| PatternRule::new(&r.pattern, r.response))
            .collect::<Result<_, _>>()?;
        Ok(Self::new(
            free_text,
            file.quick_replies,
            file.fallback.unwrap_or_else(|| FALLBACK_RESPONSE.to_string()),
        ))
    }

    /// First matching free-text rule's response, or the fallback.
    pub fn match_free_text(&self, text: &str) -> &str {
        self.free_text
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map_or(self.fallback.as_str(), |rule| rule.response.as_str())
    }

    /// Exact-label quick-reply lookup.
    pub fn quick_response(&self, label: &str) -> Option<&str> {
        self.quick
            .iter()
            .find(|q| q.label == label)
            .map(|q| q.response.as_str())
    }

    /// The menu labels, in table order.
    pub fn quick_labels(&self) -> Vec<&str> {
        self.quick.iter().map(|q| q.label.as_str()).collect()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_declared_rule_wins() {
        let rules = ResponseRules::new(
            vec![
                PatternRule::new("訂單", "first").unwrap(),
                PatternRule::new("訂單編號", "second").unwrap(),
            ],
            vec![],
            "fallback",
        );

        // Both patterns match; declaration order is the only tie-break.
        assert_eq!(rules.match_free_text("訂單編號12345"), "first");
    }

    #[test]
    fn builtin_free_text_table() {
        let rules = ResponseRules::builtin();
        assert_eq!(rules.match_free_text("訂單編號12345"), "訂單編號是20240823153700");
        assert_eq!(rules.match_free_text("請問營業時間？"), "我們的營業時間為每天9:00-18:00");
        assert_eq!(rules.match_free_text("xyz-no-match"), FALLBACK_RESPONSE);
    }

    #[test]
    fn quick_lookup_is_exact() {
        let rules = ResponseRules::builtin();
        assert!(rules.quick_response("配送問題").is_some());
        assert_eq!(rules.quick_response("配送"), None);
        assert_eq!(rules.quick_labels(), vec!["配送問題", "運送時間", "聯絡方式"]);
    }

    #[test]
    fn loads_console_export() {
        let rules = ResponseRules::from_json(
            r#"{
                "rules": [{"pattern": "退貨[\\s\\S]*", "response": "退貨請洽客服"}],
                "quick_replies": [{"pattern": "退貨", "response": "退貨請洽客服"}]
            }"#,
        )
        .unwrap();

        assert_eq!(rules.match_free_text("退貨要多久"), "退貨請洽客服");
        assert_eq!(rules.quick_response("退貨"), Some("退貨請洽客服"));
        assert_eq!(rules.match_free_text("nope"), FALLBACK_RESPONSE);
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = ResponseRules::from_json(
            r#"{"rules": [{"pattern": "([", "response": "x"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleTableError::Pattern { .. }));
    }
}
