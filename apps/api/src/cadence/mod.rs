//! Gentle Cadence: maps the user's mood and a 0–100 energy slider to a posting suggestion.
//!
//! Pure lookup, no LLM call. The table is an exhaustive `match` over
//! (Mood, EnergyLevel) so adding a variant fails to compile until every
//! pair has advice.

pub mod handlers;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Highest accepted energy score (inclusive).
pub const MAX_ENERGY_SCORE: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CadenceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Scattered,
    Tired,
    Inspired,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Scattered => "scattered",
            Mood::Tired => "tired",
            Mood::Inspired => "inspired",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scattered" => Ok(Mood::Scattered),
            "tired" => Ok(Mood::Tired),
            "inspired" => Ok(Mood::Inspired),
            other => Err(CadenceError::InvalidInput(format!(
                "unknown mood '{other}' (expected scattered, tired or inspired)"
            ))),
        }
    }
}

/// Discretized energy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// Buckets a raw slider value.
    ///
    /// `< 33` is Low, `33..66` is Medium, `>= 66` is High. Values outside
    /// `0..=100` are rejected, not clamped.
    pub fn from_score(score: i64) -> Result<Self, CadenceError> {
        if !(0..=MAX_ENERGY_SCORE).contains(&score) {
            return Err(CadenceError::InvalidInput(format!(
                "energy score {score} is outside 0..={MAX_ENERGY_SCORE}"
            )));
        }

        Ok(if score < 33 {
            EnergyLevel::Low
        } else if score < 66 {
            EnergyLevel::Medium
        } else {
            EnergyLevel::High
        })
    }
}

/// Returns the canned suggestion for a (mood, level) pair.
pub fn advice(mood: Mood, level: EnergyLevel) -> &'static str {
    match (mood, level) {
        (Mood::Scattered, EnergyLevel::Low) => {
            "It's okay to rest. Maybe just one gentle post, or none at all. Your presence is enough."
        }
        (Mood::Scattered, EnergyLevel::Medium) => {
            "Focus on one small thing. A single photo, a short thought. No pressure."
        }
        (Mood::Scattered, EnergyLevel::High) => {
            "Channel that energy! Try a quick burst of posts, like an IG story series, then log off."
        }
        (Mood::Tired, EnergyLevel::Low) => {
            "Permission to be offline. Rest is productive. Come back when you're ready."
        }
        (Mood::Tired, EnergyLevel::Medium) => {
            "Share something simple that's already created. A past photo, a favorite quote."
        }
        (Mood::Tired, EnergyLevel::High) => {
            "A quick 'hello' is plenty. Don't push. Maybe reshare something that inspires you."
        }
        (Mood::Inspired, EnergyLevel::Low) => {
            "Capture the spark without needing to perfect it. A note, a voice memo, a draft."
        }
        (Mood::Inspired, EnergyLevel::Medium) => {
            "Ride the wave. Create and share what feels good. Don't overthink the schedule."
        }
        (Mood::Inspired, EnergyLevel::High) => {
            "Flow with it! This is a great time for a series, a deep-dive post, or batch-creating content."
        }
    }
}

/// A resolved suggestion, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub mood: Mood,
    pub energy_level: EnergyLevel,
    pub advice: &'static str,
}

/// Buckets `energy_score` and looks up the advice for `mood`.
pub fn recommend(mood: Mood, energy_score: i64) -> Result<Recommendation, CadenceError> {
    let energy_level = EnergyLevel::from_score(energy_score)?;
    Ok(Recommendation {
        mood,
        energy_level,
        advice: advice(mood, energy_level),
    })
}
