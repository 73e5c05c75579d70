use crate::error::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum GoalType {
    Activity,
    ScreenTime,
    Nutrition,
    Sleep,
}

/// Which way a behavior value should move for the user to be doing better.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    MoreIsBetter,
    LessIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Discrete screen time categories.
    ScreenTime,
    /// Percentage-of-goal categories for activity, nutrition and sleep.
    Percentage,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Activity => "activity",
            GoalType::ScreenTime => "screenTime",
            GoalType::Nutrition => "nutrition",
            GoalType::Sleep => "sleep",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            GoalType::ScreenTime => Direction::LessIsBetter,
            _ => Direction::MoreIsBetter,
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            GoalType::ScreenTime => Scheme::ScreenTime,
            _ => Scheme::Percentage,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            GoalType::Activity | GoalType::ScreenTime => "minutes",
            GoalType::Nutrition => "servings",
            GoalType::Sleep => "hours",
        }
    }
}

impl TryFrom<&str> for GoalType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "activity" => Ok(GoalType::Activity),
            "screentime" | "screen_time" | "screen-time" => Ok(GoalType::ScreenTime),
            "nutrition" | "eating" | "fruits" | "fruit_veg" => Ok(GoalType::Nutrition),
            "sleep" => Ok(GoalType::Sleep),
            _ => Err(()),
        }
    }
}

/// Raw behavior data as the routing layer hands it over.
///
/// Every numeric field is optional: a missing value means "unset", which the
/// classifier treats differently from zero.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPayload {
    #[serde(default)]
    pub goal_type: String,
    #[serde(default)]
    pub goal_value: Option<f64>,
    #[serde(default)]
    pub behavior_value: Option<f64>,
    #[serde(default)]
    pub recommended_value: Option<f64>,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A validated snapshot of one goal for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorRecord {
    pub goal_type: GoalType,
    pub goal_value: Option<f64>,
    pub behavior_value: Option<f64>,
    pub recommended_value: Option<f64>,
    pub reflection: Option<String>,
    pub date: Option<String>,
}

impl BehaviorPayload {
    pub fn into_record(self) -> Result<BehaviorRecord, EngineError> {
        let goal_type = GoalType::try_from(self.goal_type.as_str()).map_err(|_| {
            EngineError::invalid(
                "goalType",
                format!("unknown goal type '{}'", self.goal_type),
            )
        })?;

        let goal_value = checked_value("goalValue", self.goal_value)?;
        let behavior_value = checked_value("behaviorValue", self.behavior_value)?;
        let recommended_value = checked_value("recommendedValue", self.recommended_value)?;

        let reflection = self
            .reflection
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(BehaviorRecord {
            goal_type,
            goal_value,
            behavior_value,
            recommended_value,
            reflection,
            date: self.date,
        })
    }
}

fn checked_value(field: &'static str, value: Option<f64>) -> Result<Option<f64>, EngineError> {
    match value {
        Some(v) if !v.is_finite() => Err(EngineError::invalid(field, "value must be a finite number")),
        Some(v) if v < 0.0 => Err(EngineError::invalid(
            field,
            format!("value must not be negative, got {v}"),
        )),
        other => Ok(other),
    }
}

/// Recommended values used when the caller does not supply one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guidelines {
    pub activity_minutes: f64,
    pub screen_time_minutes: f64,
    pub nutrition_servings: f64,
    pub sleep_hours: f64,
}

impl Default for Guidelines {
    fn default() -> Self {
        Self {
            activity_minutes: 60.0,
            screen_time_minutes: 120.0,
            nutrition_servings: 5.0,
            sleep_hours: 9.0,
        }
    }
}

impl Guidelines {
    pub fn recommended_for(&self, goal_type: GoalType) -> f64 {
        match goal_type {
            GoalType::Activity => self.activity_minutes,
            GoalType::ScreenTime => self.screen_time_minutes,
            GoalType::Nutrition => self.nutrition_servings,
            GoalType::Sleep => self.sleep_hours,
        }
    }
}

impl BehaviorRecord {
    /// Fills `recommended_value` from the guidelines when the caller left it unset.
    pub fn with_guideline(mut self, guidelines: &Guidelines) -> Self {
        if self.recommended_value.is_none() {
            self.recommended_value = Some(guidelines.recommended_for(self.goal_type));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(goal_type: &str) -> BehaviorPayload {
        BehaviorPayload {
            goal_type: goal_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_goal_type_aliases() {
        assert_eq!(GoalType::try_from("screenTime"), Ok(GoalType::ScreenTime));
        assert_eq!(GoalType::try_from("screentime"), Ok(GoalType::ScreenTime));
        assert_eq!(GoalType::try_from(" Eating "), Ok(GoalType::Nutrition));
        assert_eq!(GoalType::try_from("SLEEP"), Ok(GoalType::Sleep));
        assert!(GoalType::try_from("meditation").is_err());
    }

    #[test]
    fn test_direction_and_scheme() {
        assert_eq!(GoalType::ScreenTime.direction(), Direction::LessIsBetter);
        assert_eq!(GoalType::Sleep.direction(), Direction::MoreIsBetter);
        assert_eq!(GoalType::ScreenTime.scheme(), Scheme::ScreenTime);
        assert_eq!(GoalType::Nutrition.scheme(), Scheme::Percentage);
    }

    #[test]
    fn test_unknown_goal_type_rejected() {
        let err = payload("meditation").into_record().unwrap_err();
        assert_eq!(err.field(), Some("goalType"));
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut p = payload("activity");
        p.behavior_value = Some(-1.0);
        let err = p.into_record().unwrap_err();
        assert_eq!(err.field(), Some("behaviorValue"));

        let mut p = payload("sleep");
        p.recommended_value = Some(f64::NAN);
        let err = p.into_record().unwrap_err();
        assert_eq!(err.field(), Some("recommendedValue"));
    }

    #[test]
    fn test_missing_fields_are_unset_not_zero() {
        let record: BehaviorPayload =
            serde_json::from_str(r#"{"goalType":"screenTime","behaviorValue":0}"#).unwrap();
        let record = record.into_record().unwrap();
        assert_eq!(record.goal_value, None);
        assert_eq!(record.behavior_value, Some(0.0));
        assert_eq!(record.recommended_value, None);
    }

    #[test]
    fn test_blank_reflection_dropped() {
        let mut p = payload("activity");
        p.reflection = Some("   ".to_string());
        assert_eq!(p.into_record().unwrap().reflection, None);
    }

    #[test]
    fn test_guideline_only_fills_unset() {
        let guidelines = Guidelines::default();
        let mut p = payload("sleep");
        p.recommended_value = Some(10.0);
        let record = p.into_record().unwrap().with_guideline(&guidelines);
        assert_eq!(record.recommended_value, Some(10.0));

        let record = payload("sleep")
            .into_record()
            .unwrap()
            .with_guideline(&guidelines);
        assert_eq!(record.recommended_value, Some(9.0));
    }
}
