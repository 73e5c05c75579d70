use crate::domain::{BehaviorRecord, GoalType, Scheme};
use crate::feedback::classifier::Classification;
use serde::Serialize;
use serde_json::Value;

pub const SCREEN_TIME_WORD_BUDGET: u32 = 60;
pub const PROGRESS_WORD_BUDGET: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub instruction: String,
    pub content: String,
    pub word_budget: u32,
    pub max_tokens: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Facts<'a> {
    goal_type: &'static str,
    unit: &'static str,
    goal_value: Value,
    behavior_value: Value,
    recommended_value: Value,
    pct_of_goal: Value,
    pct_of_recommended: Value,
    category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reflection: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
}

const PROGRESS_RULES: &str = "You give short feedback to a student about one of their health behavior goals. \
You will be given the behavior type, the recommended amount, the student's own goal, the amount they actually did, \
the percentage of their goal achieved and the percentage of the recommendation achieved. \
If they achieved less than 50% of their goal, tell them to put in extra effort and give them tips. \
If they achieved more than 50%, encourage them to reach the goal and keep it up. \
If they met their goal, congratulate them and give them a high five. \
If their goal is above the recommended amount, praise them for setting a goal higher than recommended. \
If they achieved more than 120% of their goal, tell them they nailed it. \
If the goal is not set or is 0, tell them to set a valid amount for their goal. \
If the amount they did is 0, tell them they need to get started.";

/// Builds the generation request for a classified record. Pure.
pub fn build_request(record: &BehaviorRecord, classification: &Classification) -> GenerationRequest {
    let scheme = record.goal_type.scheme();
    let word_budget = match scheme {
        Scheme::ScreenTime => SCREEN_TIME_WORD_BUDGET,
        Scheme::Percentage => PROGRESS_WORD_BUDGET,
    };

    let mut instruction = match scheme {
        Scheme::ScreenTime => format!(
            "You give short feedback to a student about their daily screen time, where less is better. {}",
            classification.category.intent()
        ),
        Scheme::Percentage => format!(
            "{PROGRESS_RULES}\nFor this student: {}\nGive realistic advice on how to improve, relevant to the goal type: {}",
            classification.category.intent(),
            tips_for(record.goal_type)
        ),
    };
    if record.reflection.is_some() {
        instruction.push_str("\nThe student wrote a reflection about this behavior; incorporate it into your feedback.");
    }
    instruction.push_str(&format!(
        "\nKeep your feedback encouraging and limited to {word_budget} words."
    ));

    GenerationRequest {
        instruction,
        content: facts_json(record, classification),
        word_budget,
        max_tokens: (word_budget * 2) as u16,
    }
}

fn tips_for(goal_type: GoalType) -> &'static str {
    match goal_type {
        GoalType::Activity => "specific exercises or active games they can fit into the day.",
        GoalType::ScreenTime => "specific alternatives to phones, tablets and laptops.",
        GoalType::Nutrition => "specific fruits and vegetables to eat and easy ways to add them to meals.",
        GoalType::Sleep => "specific sleep habits such as a regular bedtime and no screens before bed.",
    }
}

fn facts_json(record: &BehaviorRecord, classification: &Classification) -> String {
    let metrics = &classification.metrics;
    let facts = Facts {
        goal_type: record.goal_type.as_str(),
        unit: record.goal_type.unit(),
        goal_value: number(record.goal_value),
        behavior_value: number(record.behavior_value),
        recommended_value: number(metrics.recommended_value),
        pct_of_goal: percent(metrics.pct_of_goal),
        pct_of_recommended: percent(metrics.pct_of_recommended),
        category: classification.category.id(),
        reflection: record.reflection.as_deref(),
        date: record.date.as_deref(),
    };
    // Facts holds only strings and JSON values, so serialization cannot fail.
    serde_json::to_string(&facts).unwrap_or_default()
}

/// Whole numbers are written without a fractional part so the prompt reads
/// `60` rather than `60.0`.
fn number(value: Option<f64>) -> Value {
    match value {
        None => Value::Null,
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Value::from(v as i64),
        Some(v) => Value::from(v),
    }
}

fn percent(ratio: Option<f64>) -> Value {
    number(ratio.map(|r| (r * 1000.0).round() / 10.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::classifier::{classify, Thresholds};

    fn build(record: &BehaviorRecord) -> GenerationRequest {
        let classification = classify(record, &Thresholds::default()).unwrap();
        build_request(record, &classification)
    }

    fn record(goal_type: GoalType, goal: Option<f64>, behavior: Option<f64>) -> BehaviorRecord {
        BehaviorRecord {
            goal_type,
            goal_value: goal,
            behavior_value: behavior,
            recommended_value: None,
            reflection: None,
            date: None,
        }
    }

    #[test]
    fn test_facts_contain_record_values() {
        let req = build(&record(GoalType::Activity, Some(60.0), Some(45.0)));
        assert!(req.content.contains(r#""goalType":"activity""#));
        assert!(req.content.contains(r#""goalValue":60"#));
        assert!(req.content.contains(r#""behaviorValue":45"#));
        assert!(req.content.contains(r#""pctOfGoal":75"#));
        assert!(req.content.contains(r#""category":"Encourage""#));
    }

    #[test]
    fn test_fractional_values_kept() {
        let req = build(&record(GoalType::Sleep, Some(8.5), Some(7.25)));
        assert!(req.content.contains(r#""goalValue":8.5"#));
        assert!(req.content.contains(r#""behaviorValue":7.25"#));
    }

    #[test]
    fn test_unset_values_are_null() {
        let req = build(&record(GoalType::ScreenTime, None, Some(30.0)));
        assert!(req.content.contains(r#""goalValue":null"#));
        assert!(req.content.contains(r#""goalType":"screenTime""#));
    }

    #[test]
    fn test_reflection_omitted_when_absent() {
        let req = build(&record(GoalType::Nutrition, Some(5.0), Some(3.0)));
        assert!(!req.content.contains("reflection"));
        assert!(!req.instruction.contains("reflection"));
    }

    #[test]
    fn test_reflection_included_when_present() {
        let mut r = record(GoalType::Nutrition, Some(5.0), Some(3.0));
        r.reflection = Some("ate an apple at lunch".to_string());
        let req = build(&r);
        assert!(req.content.contains(r#""reflection":"ate an apple at lunch""#));
        assert!(req.instruction.contains("reflection"));
    }

    #[test]
    fn test_word_budget_by_scheme() {
        let screen = build(&record(GoalType::ScreenTime, Some(60.0), Some(60.0)));
        assert_eq!(screen.word_budget, 60);
        assert!(screen.instruction.contains("limited to 60 words"));
        assert!(screen.instruction.contains("recommended value"));

        let sleep = build(&record(GoalType::Sleep, Some(8.0), Some(4.0)));
        assert_eq!(sleep.word_budget, 50);
        assert_eq!(sleep.max_tokens, 100);
        assert!(sleep.instruction.contains("limited to 50 words"));
        assert!(sleep.instruction.contains("bedtime"));
    }
}
