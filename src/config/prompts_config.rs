use serde::{Deserialize, Serialize};

use crate::insights::DEFAULT_INSIGHT_SYSTEM_PROMPT;
use crate::narrative::prompts::{DEFAULT_QUESTION_SYSTEM_PROMPT, DEFAULT_SUMMARY_SYSTEM_PROMPT};

/// System prompts for the three kinds of AI requests.
///
/// `insight_system` may contain `{service}` and `{question}` placeholders.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PromptsConfig {
    pub summary_system: String,
    pub question_system: String,
    pub insight_system: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialPromptsConfig {
    pub summary_system: Option<String>,
    pub question_system: Option<String>,
    pub insight_system: Option<String>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self::from_partial(None)
    }
}

impl PromptsConfig {
    pub fn from_partial(partial: Option<PartialPromptsConfig>) -> Self {
        let partial = partial.unwrap_or_default();
        let non_blank = |value: Option<String>| value.filter(|s| !s.trim().is_empty());

        Self {
            summary_system: non_blank(partial.summary_system)
                .unwrap_or_else(|| DEFAULT_SUMMARY_SYSTEM_PROMPT.to_string()),
            question_system: non_blank(partial.question_system)
                .unwrap_or_else(|| DEFAULT_QUESTION_SYSTEM_PROMPT.to_string()),
            insight_system: non_blank(partial.insight_system)
                .unwrap_or_else(|| DEFAULT_INSIGHT_SYSTEM_PROMPT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_override_keeps_default() {
        let partial = PartialPromptsConfig {
            summary_system: Some("   ".to_string()),
            question_system: Some("Answer briefly.".to_string()),
            insight_system: None,
        };
        let prompts = PromptsConfig::from_partial(Some(partial));
        assert_eq!(prompts.summary_system, DEFAULT_SUMMARY_SYSTEM_PROMPT);
        assert_eq!(prompts.question_system, "Answer briefly.");
        assert!(prompts.insight_system.contains("{service}"));
    }
}
