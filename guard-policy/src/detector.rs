//! Keyword-based hard-block detection.

use guard_primitives::flags;

use crate::integrations::HardBlockDetector;

const SENSITIVE_KEYWORDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "api key",
    "api_key",
    "apikey",
    "access token",
    "private key",
    "credential",
    "ssn",
    "social security",
    "credit card",
    "card number",
    "pii",
    "exfiltrat",
];

const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "rm -rf",
    "drop table",
    "drop database",
    "truncate table",
    "mkfs",
];

/// Case-insensitive substring detector over fixed keyword lists.
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    rules: Vec<(&'static str, Vec<String>)>,
}

impl KeywordDetector {
    /// Creates the detector with the built-in keyword lists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: vec![
                (flags::SENSITIVE_DATA, owned(SENSITIVE_KEYWORDS)),
                (flags::DESTRUCTIVE_COMMAND, owned(DESTRUCTIVE_KEYWORDS)),
            ],
        }
    }

    /// Adds a keyword for `flag`, registering the flag after the built-in ones
    /// when it is new.
    #[must_use]
    pub fn with_keyword(mut self, flag: &'static str, keyword: &str) -> Self {
        let keyword = keyword.to_lowercase();
        match self.rules.iter_mut().find(|(known, _)| *known == flag) {
            Some((_, keywords)) => keywords.push(keyword),
            None => self.rules.push((flag, vec![keyword])),
        }
        self
    }
}

fn owned(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|keyword| (*keyword).to_owned()).collect()
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HardBlockDetector for KeywordDetector {
    fn detect(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword.as_str())))
            .map(|(flag, _)| (*flag).to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_sensitive_text_case_insensitively() {
        let detector = KeywordDetector::new();
        assert_eq!(
            detector.detect("export\nUpload customer PASSWORD dump"),
            [flags::SENSITIVE_DATA]
        );
        assert_eq!(detector.detect("Exfiltrate the CRM"), [flags::SENSITIVE_DATA]);
    }

    #[test]
    fn reports_each_flag_once_in_fixed_order() {
        let detector = KeywordDetector::new();
        let found = detector.detect("DROP TABLE users; also dump the api key and the secret");
        assert_eq!(found, [flags::SENSITIVE_DATA, flags::DESTRUCTIVE_COMMAND]);
    }

    #[test]
    fn clean_text_raises_nothing() {
        assert!(KeywordDetector::new().detect("delete\nDelete all").is_empty());
    }

    #[test]
    fn custom_keywords_extend_lists() {
        let detector = KeywordDetector::new()
            .with_keyword(flags::SENSITIVE_DATA, "Payroll")
            .with_keyword("LEGAL_HOLD", "litigation");
        assert_eq!(detector.detect("payroll export"), [flags::SENSITIVE_DATA]);
        assert_eq!(detector.detect("litigation archive"), ["LEGAL_HOLD"]);
    }
}
