use crate::feedback::classifier::{FeedbackCategory, Tone};
use crate::services::generation::GenerationError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFeedback {
    pub text: String,
    pub origin: Origin,
    /// Set when generated text ran well past the requested word budget.
    pub length_advisory: bool,
    /// Why a fallback was used: the generation error kind, or `empty-response`.
    pub fallback_reason: Option<&'static str>,
}

pub fn fallback_text(tone: Tone) -> &'static str {
    match tone {
        Tone::Celebrate => "Great work on your goal! Every healthy choice adds up. Keep it going tomorrow!",
        Tone::Encourage => "You're making progress. Keep pushing and you'll reach your goal soon!",
        Tone::Nudge => "Every day is a new chance. Pick one small step today and build from there. You've got this!",
        Tone::Setup => "Set your goal and save your progress so we can cheer you on. You've got this!",
    }
}

/// Turns a generation outcome into the message shown to the user. Never fails.
pub fn validate(
    outcome: Result<String, GenerationError>,
    category: FeedbackCategory,
    word_budget: u32,
) -> ValidatedFeedback {
    let fallback = |reason: &'static str| ValidatedFeedback {
        text: fallback_text(category.tone()).to_string(),
        origin: Origin::Fallback,
        length_advisory: false,
        fallback_reason: Some(reason),
    };

    match outcome {
        Ok(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                tracing::warn!(category = category.id(), "generator returned empty text");
                return fallback("empty-response");
            }
            let words = text.split_whitespace().count();
            let length_advisory = words > (word_budget as usize) * 2;
            if length_advisory {
                tracing::info!(
                    category = category.id(),
                    words,
                    word_budget,
                    "length-advisory: generated feedback exceeds twice the word budget"
                );
            }
            ValidatedFeedback {
                text: text.to_string(),
                origin: Origin::Generated,
                length_advisory,
                fallback_reason: None,
            }
        }
        Err(e) => {
            tracing::warn!(category = category.id(), "using fallback feedback: {}", e);
            fallback(e.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::classifier::{ProgressCategory, ScreenTimeCategory};
    use std::time::Duration;

    const MET: FeedbackCategory = FeedbackCategory::ScreenTime(ScreenTimeCategory::MetGoal);

    #[test]
    fn test_generated_text_trimmed() {
        let v = validate(Ok("\n  Nice work!  \n".to_string()), MET, 60);
        assert_eq!(v.text, "Nice work!");
        assert_eq!(v.origin, Origin::Generated);
        assert!(!v.length_advisory);
        assert_eq!(v.fallback_reason, None);
    }

    #[test]
    fn test_long_text_flagged_not_truncated() {
        let long = vec!["word"; 130].join(" ");
        let v = validate(Ok(long.clone()), MET, 60);
        assert_eq!(v.text, long);
        assert!(v.length_advisory);

        let v = validate(Ok(vec!["word"; 120].join(" ")), MET, 60);
        assert!(!v.length_advisory);
    }

    #[test]
    fn test_errors_become_fallback() {
        let v = validate(Err(GenerationError::Timeout(Duration::from_secs(10))), MET, 60);
        assert_eq!(v.origin, Origin::Fallback);
        assert_eq!(v.fallback_reason, Some("timeout"));
        assert!(!v.text.is_empty());

        let nudge = FeedbackCategory::Progress(ProgressCategory::NeedsEffort);
        let v = validate(Err(GenerationError::Unavailable("502".to_string())), nudge, 50);
        assert_eq!(v.fallback_reason, Some("unavailable"));
        assert_eq!(v.text, fallback_text(Tone::Nudge));
    }

    #[test]
    fn test_blank_generation_becomes_fallback() {
        let v = validate(Ok("   ".to_string()), MET, 60);
        assert_eq!(v.origin, Origin::Fallback);
        assert_eq!(v.fallback_reason, Some("empty-response"));
        assert_eq!(v.text, fallback_text(Tone::Celebrate));
    }
}
