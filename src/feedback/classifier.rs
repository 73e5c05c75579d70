use crate::domain::{BehaviorRecord, Direction, Scheme};
use crate::error::EngineError;
use serde::Serialize;

/// Cut-off points for category selection. They are heuristics carried over
/// from the coaching rules and can be tuned through configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Screen time above `goal * severe_multiplier` is severely over goal.
    pub severe_multiplier: f64,
    /// Screen time at or below `goal * champion_fraction` earns the champion tier.
    pub champion_fraction: f64,
    /// Below this share of the goal the user needs extra effort.
    pub needs_effort_ratio: f64,
    /// At or above this share of the goal the user nailed it.
    pub nailed_it_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            severe_multiplier: 2.0,
            champion_fraction: 0.5,
            needs_effort_ratio: 0.5,
            nailed_it_ratio: 1.2,
        }
    }
}

/// Tone of a category, used to pick a fallback line when generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Celebrate,
    Encourage,
    Nudge,
    Setup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTimeCategory {
    NoGoalSet,
    NotStarted,
    NothingSaved,
    SeverelyOverGoal,
    MissedGoal,
    MetGoal,
    BeatOwnGoalOnly,
    Champion,
    OnTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCategory {
    InvalidGoal,
    NotStarted,
    NeedsEffort,
    Encourage,
    /// `surplus` marks a goal beaten by less than the nailed-it margin.
    MetGoal { surplus: bool },
    ExceededOwnAmbitiousGoal,
    NailedIt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCategory {
    ScreenTime(ScreenTimeCategory),
    Progress(ProgressCategory),
}

impl FeedbackCategory {
    pub fn id(&self) -> &'static str {
        match self {
            FeedbackCategory::ScreenTime(c) => match c {
                ScreenTimeCategory::NoGoalSet => "NoGoalSet",
                ScreenTimeCategory::NotStarted => "NotStarted",
                ScreenTimeCategory::NothingSaved => "NothingSaved",
                ScreenTimeCategory::SeverelyOverGoal => "SeverelyOverGoal",
                ScreenTimeCategory::MissedGoal => "MissedGoal",
                ScreenTimeCategory::MetGoal => "MetGoal",
                ScreenTimeCategory::BeatOwnGoalOnly => "BeatOwnGoalOnly",
                ScreenTimeCategory::Champion => "Champion",
                ScreenTimeCategory::OnTrack => "OnTrack",
            },
            FeedbackCategory::Progress(c) => match c {
                ProgressCategory::InvalidGoal => "InvalidGoal",
                ProgressCategory::NotStarted => "NotStarted",
                ProgressCategory::NeedsEffort => "NeedsEffort",
                ProgressCategory::Encourage => "Encourage",
                ProgressCategory::MetGoal { .. } => "MetGoal",
                ProgressCategory::ExceededOwnAmbitiousGoal => "ExceededOwnAmbitiousGoal",
                ProgressCategory::NailedIt => "Nailed It",
            },
        }
    }

    /// What the generated message should convey.
    pub fn intent(&self) -> &'static str {
        match self {
            FeedbackCategory::ScreenTime(c) => match c {
                ScreenTimeCategory::NoGoalSet => {
                    "The user has not set a screen time goal yet. Remind them to set a goal before tracking their screen time."
                }
                ScreenTimeCategory::NotStarted => {
                    "The user set a screen time goal but has not logged any screen time yet. Tell them they haven't started working towards their goal yet."
                }
                ScreenTimeCategory::NothingSaved => {
                    "The user has not saved a goal or a screen time value. Tell them to enter valid values and save their progress for this goal."
                }
                ScreenTimeCategory::SeverelyOverGoal => {
                    "The user's screen time is more than double their goal. Ask them to reduce their screen time further."
                }
                ScreenTimeCategory::MissedGoal => {
                    "The user missed their screen time goal but not by more than double. Encourage them to work harder and reach the goal."
                }
                ScreenTimeCategory::MetGoal => {
                    "The user achieved their screen time goal exactly. Congratulate them and suggest setting their goal to the recommended value."
                }
                ScreenTimeCategory::BeatOwnGoalOnly => {
                    "The user beat their screen time goal and the recommended value. Congratulate them and praise them for setting a goal stricter than recommended."
                }
                ScreenTimeCategory::Champion => {
                    "The user cut their screen time to half their goal or less. They are a champion and an achiever, praise them for it."
                }
                ScreenTimeCategory::OnTrack => {
                    "The user stayed under their screen time goal. Praise them for working towards their goal."
                }
            },
            FeedbackCategory::Progress(c) => match c {
                ProgressCategory::InvalidGoal => {
                    "The goal is not set or is zero. Tell the user to set a valid amount for their goal."
                }
                ProgressCategory::NotStarted => {
                    "The user has not logged any progress yet. Tell them they need to get started."
                }
                ProgressCategory::NeedsEffort => {
                    "The user achieved less than half of their goal. Tell them to put in extra effort and give concrete tips."
                }
                ProgressCategory::Encourage => {
                    "The user is more than halfway to their goal. Encourage them to reach it and keep it up."
                }
                ProgressCategory::MetGoal { surplus: false } => {
                    "The user met their goal. Congratulate them and give them a high five."
                }
                ProgressCategory::MetGoal { surplus: true } => {
                    "The user met their goal and went a little beyond it. Congratulate them, give them a high five and acknowledge the extra effort."
                }
                ProgressCategory::ExceededOwnAmbitiousGoal => {
                    "The user exceeded a goal they set above the recommended value. Praise them for aiming higher than recommended."
                }
                ProgressCategory::NailedIt => {
                    "The user exceeded their goal by 20% or more. Tell them they nailed it."
                }
            },
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            FeedbackCategory::ScreenTime(c) => match c {
                ScreenTimeCategory::NoGoalSet
                | ScreenTimeCategory::NotStarted
                | ScreenTimeCategory::NothingSaved => Tone::Setup,
                ScreenTimeCategory::SeverelyOverGoal => Tone::Nudge,
                ScreenTimeCategory::MissedGoal => Tone::Encourage,
                ScreenTimeCategory::MetGoal
                | ScreenTimeCategory::BeatOwnGoalOnly
                | ScreenTimeCategory::Champion
                | ScreenTimeCategory::OnTrack => Tone::Celebrate,
            },
            FeedbackCategory::Progress(c) => match c {
                ProgressCategory::InvalidGoal | ProgressCategory::NotStarted => Tone::Setup,
                ProgressCategory::NeedsEffort => Tone::Nudge,
                ProgressCategory::Encourage => Tone::Encourage,
                ProgressCategory::MetGoal { .. }
                | ProgressCategory::ExceededOwnAmbitiousGoal
                | ProgressCategory::NailedIt => Tone::Celebrate,
            },
        }
    }

    /// Ordinal praise level for percentage categories; higher means more praise.
    pub fn praise_tier(&self) -> u8 {
        match self {
            FeedbackCategory::Progress(c) => match c {
                ProgressCategory::InvalidGoal | ProgressCategory::NotStarted => 0,
                ProgressCategory::NeedsEffort => 1,
                ProgressCategory::Encourage => 2,
                ProgressCategory::MetGoal { .. } => 3,
                ProgressCategory::ExceededOwnAmbitiousGoal | ProgressCategory::NailedIt => 4,
            },
            FeedbackCategory::ScreenTime(c) => match c {
                ScreenTimeCategory::NoGoalSet
                | ScreenTimeCategory::NotStarted
                | ScreenTimeCategory::NothingSaved => 0,
                ScreenTimeCategory::SeverelyOverGoal => 1,
                ScreenTimeCategory::MissedGoal => 2,
                ScreenTimeCategory::MetGoal => 3,
                ScreenTimeCategory::OnTrack | ScreenTimeCategory::BeatOwnGoalOnly => 4,
                ScreenTimeCategory::Champion => 5,
            },
        }
    }
}

/// Numbers that drove the category choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub direction: Direction,
    pub pct_of_goal: Option<f64>,
    pub pct_of_recommended: Option<f64>,
    pub recommended_value: Option<f64>,
    pub goal_unset: bool,
    pub behavior_unset: bool,
    pub goal_zero: bool,
    pub behavior_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: FeedbackCategory,
    pub metrics: Metrics,
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

fn metrics_for(record: &BehaviorRecord) -> Metrics {
    Metrics {
        direction: record.goal_type.direction(),
        pct_of_goal: ratio(record.behavior_value, record.goal_value),
        pct_of_recommended: ratio(record.behavior_value, record.recommended_value),
        recommended_value: record.recommended_value,
        goal_unset: record.goal_value.is_none(),
        behavior_unset: record.behavior_value.is_none(),
        goal_zero: record.goal_value == Some(0.0),
        behavior_zero: record.behavior_value == Some(0.0),
        reflection: record.reflection.clone(),
    }
}

/// Picks the feedback category for a record. Rules are checked in order and
/// the first one that holds wins.
pub fn classify(
    record: &BehaviorRecord,
    thresholds: &Thresholds,
) -> Result<Classification, EngineError> {
    let category = match record.goal_type.scheme() {
        Scheme::ScreenTime => FeedbackCategory::ScreenTime(classify_screen_time(record, thresholds)?),
        Scheme::Percentage => FeedbackCategory::Progress(classify_progress(record, thresholds)?),
    };

    Ok(Classification {
        category,
        metrics: metrics_for(record),
    })
}

fn classify_screen_time(
    record: &BehaviorRecord,
    t: &Thresholds,
) -> Result<ScreenTimeCategory, EngineError> {
    let (goal, behavior) = match (record.goal_value, record.behavior_value) {
        (None, None) => return Ok(ScreenTimeCategory::NothingSaved),
        (None, Some(_)) => return Ok(ScreenTimeCategory::NoGoalSet),
        (Some(_), None) => return Ok(ScreenTimeCategory::NotStarted),
        (Some(goal), Some(behavior)) => (goal, behavior),
    };

    if behavior > goal * t.severe_multiplier {
        return Ok(ScreenTimeCategory::SeverelyOverGoal);
    }
    if behavior > goal {
        return Ok(ScreenTimeCategory::MissedGoal);
    }
    if behavior == goal {
        return Ok(ScreenTimeCategory::MetGoal);
    }
    if let Some(recommended) = record.recommended_value {
        if goal <= recommended {
            return Ok(ScreenTimeCategory::BeatOwnGoalOnly);
        }
    }
    if behavior <= goal * t.champion_fraction {
        return Ok(ScreenTimeCategory::Champion);
    }
    if behavior < goal {
        return Ok(ScreenTimeCategory::OnTrack);
    }

    tracing::error!(goal, behavior, "screen time record matched no category");
    Err(EngineError::InternalClassification(format!(
        "screenTime goal={goal} behavior={behavior}"
    )))
}

fn classify_progress(
    record: &BehaviorRecord,
    t: &Thresholds,
) -> Result<ProgressCategory, EngineError> {
    let goal = match record.goal_value {
        Some(goal) if goal > 0.0 => goal,
        _ => return Ok(ProgressCategory::InvalidGoal),
    };
    let behavior = match record.behavior_value {
        Some(behavior) if behavior > 0.0 => behavior,
        _ => return Ok(ProgressCategory::NotStarted),
    };

    let pct_of_goal = behavior / goal;

    if pct_of_goal < t.needs_effort_ratio {
        return Ok(ProgressCategory::NeedsEffort);
    }
    if pct_of_goal < 1.0 {
        return Ok(ProgressCategory::Encourage);
    }
    if behavior == goal {
        return Ok(ProgressCategory::MetGoal { surplus: false });
    }
    if pct_of_goal > 1.0 {
        if let Some(recommended) = record.recommended_value {
            if goal > recommended {
                return Ok(ProgressCategory::ExceededOwnAmbitiousGoal);
            }
        }
        if pct_of_goal >= t.nailed_it_ratio {
            return Ok(ProgressCategory::NailedIt);
        }
        return Ok(ProgressCategory::MetGoal { surplus: true });
    }

    tracing::error!(goal, behavior, goal_type = record.goal_type.as_str(), "record matched no category");
    Err(EngineError::InternalClassification(format!(
        "{} goal={goal} behavior={behavior}",
        record.goal_type.as_str()
    )))
}
