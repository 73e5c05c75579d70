use crate::domain::{BehaviorPayload, Guidelines};
use crate::error::EngineError;
use crate::feedback::classifier::{classify, Thresholds};
use crate::feedback::prompt::build_request;
use crate::feedback::validator::{validate, Origin};
use crate::services::generation::TextGenerator;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub thresholds: Thresholds,
    pub guidelines: Guidelines,
    pub generation_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            guidelines: Guidelines::default(),
            generation_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    pub category: &'static str,
    pub text: String,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<&'static str>,
}

/// Classifies behavior records and turns them into feedback messages.
///
/// Holds no per-request state; one instance is shared by every request.
#[derive(Clone)]
pub struct FeedbackEngine {
    generator: Arc<dyn TextGenerator>,
    settings: EngineSettings,
}

impl FeedbackEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: EngineSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Only `InvalidRecord` (or a classifier bug) comes back as an error;
    /// generation failures are answered with fallback text.
    pub async fn respond(&self, payload: BehaviorPayload) -> Result<FeedbackResult, EngineError> {
        let span = tracing::info_span!("feedback", request_id = %Uuid::new_v4());
        self.respond_inner(payload).instrument(span).await
    }

    /// Results come back in the same order as the payloads.
    pub async fn respond_batch(
        &self,
        payloads: Vec<BehaviorPayload>,
    ) -> Vec<Result<FeedbackResult, EngineError>> {
        join_all(payloads.into_iter().map(|p| self.respond(p))).await
    }

    async fn respond_inner(&self, payload: BehaviorPayload) -> Result<FeedbackResult, EngineError> {
        let record = payload
            .into_record()
            .map_err(|e| {
                tracing::info!("rejected behavior record: {}", e);
                e
            })?
            .with_guideline(&self.settings.guidelines);

        let classification = classify(&record, &self.settings.thresholds)?;
        let category = classification.category;
        tracing::debug!(
            goal_type = record.goal_type.as_str(),
            category = category.id(),
            pct_of_goal = ?classification.metrics.pct_of_goal,
            "classified behavior record"
        );

        let request = build_request(&record, &classification);
        let outcome = self
            .generator
            .generate(&request, self.settings.generation_timeout)
            .await;
        let feedback = validate(outcome, category, request.word_budget);

        tracing::info!(
            category = category.id(),
            origin = ?feedback.origin,
            length_advisory = feedback.length_advisory,
            "feedback ready"
        );

        Ok(FeedbackResult {
            category: category.id(),
            text: feedback.text,
            origin: feedback.origin,
            fallback_reason: feedback.fallback_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generation::testing::{Script, ScriptedGenerator};

    fn engine(generator: Arc<ScriptedGenerator>) -> FeedbackEngine {
        let settings = EngineSettings {
            generation_timeout: Duration::from_millis(50),
            ..EngineSettings::default()
        };
        FeedbackEngine::new(generator, settings)
    }

    fn payload(goal_type: &str, goal: Option<f64>, behavior: Option<f64>) -> BehaviorPayload {
        BehaviorPayload {
            goal_type: goal_type.to_string(),
            goal_value: goal,
            behavior_value: behavior,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generated_feedback() {
        let generator = Arc::new(ScriptedGenerator::reply(" You crushed your screen time goal! "));
        let result = engine(generator.clone())
            .respond(payload("screenTime", Some(120.0), Some(300.0)))
            .await
            .unwrap();
        assert_eq!(result.category, "SeverelyOverGoal");
        assert_eq!(result.origin, Origin::Generated);
        assert_eq!(result.text, "You crushed your screen time goal!");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new(Script::Hang));
        let result = engine(generator)
            .respond(payload("screenTime", Some(60.0), Some(60.0)))
            .await
            .unwrap();
        assert_eq!(result.category, "MetGoal");
        assert_eq!(result.origin, Origin::Fallback);
        assert_eq!(result.fallback_reason, Some("timeout"));
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new(Script::Fail));
        let result = engine(generator)
            .respond(payload("sleep", Some(8.0), Some(10.0)))
            .await
            .unwrap();
        assert_eq!(result.category, "Nailed It");
        assert_eq!(result.origin, Origin::Fallback);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_record_skips_generation() {
        let generator = Arc::new(ScriptedGenerator::reply("unused"));
        let err = engine(generator.clone())
            .respond(payload("activity", Some(-5.0), Some(30.0)))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("goalValue"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_guideline_reaches_prompt() {
        let generator = Arc::new(ScriptedGenerator::reply("{facts}"));
        let result = engine(generator)
            .respond(payload("nutrition", Some(5.0), Some(5.0)))
            .await
            .unwrap();
        assert_eq!(result.category, "MetGoal");
        assert!(result.text.contains(r#""recommendedValue":5"#));
        assert!(!result.text.contains("reflection"));
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let generator = Arc::new(ScriptedGenerator::reply("ok"));
        let results = engine(generator.clone())
            .respond_batch(vec![
                payload("activity", Some(0.0), Some(30.0)),
                payload("yoga", Some(1.0), Some(1.0)),
                payload("screenTime", Some(60.0), Some(60.0)),
            ])
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().category, "InvalidGoal");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().category, "MetGoal");
        assert_eq!(generator.call_count(), 2);
    }
}
