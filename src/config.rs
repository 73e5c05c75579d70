use crate::domain::Guidelines;
use crate::feedback::classifier::Thresholds;
use crate::feedback::EngineSettings;
use crate::services::generation::OpenAiSettings;
use anyhow::{anyhow, bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub openai: OpenAiSettings,
    pub engine: EngineSettings,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
    /// Key the limiter on `x-forwarded-for` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY missing"))?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| {
            let port = lookup("PORT").unwrap_or_else(|| "3001".to_string());
            format!("0.0.0.0:{}", port)
        });

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            severe_multiplier: parse_or(&lookup, "SCREEN_SEVERE_MULTIPLIER", defaults.severe_multiplier)?,
            champion_fraction: parse_or(&lookup, "SCREEN_CHAMPION_FRACTION", defaults.champion_fraction)?,
            needs_effort_ratio: parse_or(&lookup, "NEEDS_EFFORT_RATIO", defaults.needs_effort_ratio)?,
            nailed_it_ratio: parse_or(&lookup, "NAILED_IT_RATIO", defaults.nailed_it_ratio)?,
        };
        if !(thresholds.severe_multiplier > 1.0) {
            bail!("SCREEN_SEVERE_MULTIPLIER must be greater than 1");
        }
        if !(thresholds.champion_fraction > 0.0 && thresholds.champion_fraction < 1.0) {
            bail!("SCREEN_CHAMPION_FRACTION must be between 0 and 1");
        }
        if !(thresholds.needs_effort_ratio > 0.0 && thresholds.needs_effort_ratio < 1.0) {
            bail!("NEEDS_EFFORT_RATIO must be between 0 and 1");
        }
        if !(thresholds.nailed_it_ratio > 1.0) {
            bail!("NAILED_IT_RATIO must be greater than 1");
        }

        let g = Guidelines::default();
        let guidelines = Guidelines {
            activity_minutes: parse_or(&lookup, "RECOMMENDED_ACTIVITY", g.activity_minutes)?,
            screen_time_minutes: parse_or(&lookup, "RECOMMENDED_SCREEN_TIME", g.screen_time_minutes)?,
            nutrition_servings: parse_or(&lookup, "RECOMMENDED_NUTRITION", g.nutrition_servings)?,
            sleep_hours: parse_or(&lookup, "RECOMMENDED_SLEEP", g.sleep_hours)?,
        };

        let timeout_ms: u64 = parse_or(&lookup, "GENERATION_TIMEOUT_MS", 10_000)?;
        if timeout_ms == 0 {
            bail!("GENERATION_TIMEOUT_MS must be positive");
        }

        Ok(Self {
            bind_addr,
            openai: OpenAiSettings {
                api_key,
                api_base: lookup("OPENAI_API_BASE").filter(|b| !b.trim().is_empty()),
                model: lookup("FEEDBACK_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
                temperature: parse_or(&lookup, "FEEDBACK_TEMPERATURE", 0.9)?,
                presence_penalty: parse_or(&lookup, "FEEDBACK_PRESENCE_PENALTY", 0.6)?,
            },
            engine: EngineSettings {
                thresholds,
                guidelines,
                generation_timeout: Duration::from_millis(timeout_ms),
            },
            rate_limit_max: parse_or(&lookup, "RATE_LIMIT_MAX", 30)?,
            rate_limit_window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?,
            trust_forwarded_for: parse_or(&lookup, "TRUST_FORWARDED_FOR", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
