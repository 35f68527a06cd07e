//! Game feel tuning
//!
//! Scales camera feedback (shake, kick, hit-stop) without touching the
//! deterministic simulation outcome.

use serde::{Deserialize, Serialize};

/// Impact feel presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImpactFeel {
    Subtle,
    #[default]
    Normal,
    Heavy,
}

impl ImpactFeel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactFeel::Subtle => "Subtle",
            ImpactFeel::Normal => "Normal",
            ImpactFeel::Heavy => "Heavy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "subtle" | "low" => Some(ImpactFeel::Subtle),
            "normal" | "med" | "medium" => Some(ImpactFeel::Normal),
            "heavy" | "high" => Some(ImpactFeel::Heavy),
            _ => None,
        }
    }

    /// Multiplier applied to all camera shake magnitudes
    pub fn shake_scale(&self) -> f32 {
        match self {
            ImpactFeel::Subtle => 0.4,
            ImpactFeel::Normal => 1.0,
            ImpactFeel::Heavy => 1.6,
        }
    }

    /// Multiplier applied to directional camera kick
    pub fn kick_scale(&self) -> f32 {
        match self {
            ImpactFeel::Subtle => 0.3,
            ImpactFeel::Normal => 1.0,
            ImpactFeel::Heavy => 1.5,
        }
    }

    /// Hit-stop duration in ticks for a lethal player-involved impact
    pub fn hit_stop_ticks(&self, lethal: bool) -> u32 {
        let base = match self {
            ImpactFeel::Subtle => 0,
            ImpactFeel::Normal => 2,
            ImpactFeel::Heavy => 4,
        };
        if lethal { base * 3 } else { base }
    }

    /// Shake cap for events the player caused
    pub fn player_caused_cap(&self) -> f32 {
        match self {
            ImpactFeel::Subtle => 0.35,
            ImpactFeel::Normal => 0.8,
            ImpactFeel::Heavy => 1.2,
        }
    }

    /// Shake cap for events the player received (kept higher for readability)
    pub fn player_received_cap(&self) -> f32 {
        match self {
            ImpactFeel::Subtle => 0.5,
            ImpactFeel::Normal => 1.0,
            ImpactFeel::Heavy => 1.5,
        }
    }
}
