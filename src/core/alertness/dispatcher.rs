//! Rate-limited intervention selection.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::AlertLevel;
use super::signal::DriveContext;
use crate::core::config::InterventionConfig;

/// Intervention strength, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionAction {
    None,
    SoftPrompt,
    ActiveAlert,
    UrgentAlert,
}

impl InterventionAction {
    pub fn for_level(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Normal => InterventionAction::None,
            AlertLevel::Mild => InterventionAction::SoftPrompt,
            AlertLevel::Moderate => InterventionAction::ActiveAlert,
            AlertLevel::Severe => InterventionAction::UrgentAlert,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InterventionAction::None => "none",
            InterventionAction::SoftPrompt => "soft_prompt",
            InterventionAction::ActiveAlert => "active_alert",
            InterventionAction::UrgentAlert => "urgent_alert",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            InterventionAction::None => "Driver is alert and attentive.",
            InterventionAction::SoftPrompt => {
                "Mild fatigue detected. Consider taking a short break soon."
            }
            InterventionAction::ActiveAlert => {
                "Moderate fatigue detected. Please take a break soon."
            }
            InterventionAction::UrgentAlert => {
                "Severe fatigue detected! Please pull over safely immediately."
            }
        }
    }

    /// Suggested renderer actions, most important first.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            InterventionAction::None => &[],
            InterventionAction::SoftPrompt => &[
                "gentle prompt",
                "subtle UI color change",
                "suggest break location",
            ],
            InterventionAction::ActiveAlert => &[
                "alert pop-up",
                "repeated prompt",
                "haptic feedback",
                "increase cabin alertness (brightness, AC)",
            ],
            InterventionAction::UrgentAlert => &[
                "urgent warning",
                "loud audible alert",
                "strong haptic feedback",
                "emergency contact notification",
                "assist with safe pullover",
            ],
        }
    }
}

impl std::fmt::Display for InterventionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Visual,
    Voice,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::Visual => 0,
            Channel::Voice => 1,
        }
    }

    fn cooldown(self, config: &InterventionConfig) -> Duration {
        let secs = match self {
            Channel::Visual => config.visual_cooldown_secs,
            Channel::Voice => config.voice_cooldown_secs,
        };
        Duration::milliseconds((secs * 1000.0).round() as i64)
    }

    fn enabled(self, config: &InterventionConfig) -> bool {
        match self {
            Channel::Visual => config.enable_visual,
            Channel::Voice => config.enable_voice,
        }
    }

    fn other(self) -> Channel {
        match self {
            Channel::Visual => Channel::Voice,
            Channel::Voice => Channel::Visual,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Visual => f.write_str("visual"),
            Channel::Voice => f.write_str("voice"),
        }
    }
}

/// An emitted intervention. Never stored by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionEvent {
    pub channel: Channel,
    pub severity: InterventionAction,
    pub level: AlertLevel,
    pub message: String,
    pub actions: Vec<String>,
    pub triggered_at: DateTime<Utc>,
}

/// Preferred channel for the current context, falling back to the other
/// one when disabled.
pub fn select_channel(ctx: &DriveContext, config: &InterventionConfig) -> Option<Channel> {
    // speech at speed adds cognitive load
    let preferred = if ctx.speed_kmh > config.speed_threshold_high {
        Channel::Visual
    } else {
        Channel::Voice
    };
    [preferred, preferred.other()]
        .into_iter()
        .find(|c| c.enabled(config))
}

/// Per-channel cooldown gate. Escalations always pass.
#[derive(Debug, Clone, Default)]
pub struct InterventionDispatcher {
    last: [Option<(DateTime<Utc>, InterventionAction)>; 2],
    emitted: u64,
    suppressed: u64,
}

impl InterventionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn dispatch(
        &mut self,
        level: AlertLevel,
        ctx: &DriveContext,
        now: DateTime<Utc>,
        config: &InterventionConfig,
    ) -> Option<InterventionEvent> {
        let action = InterventionAction::for_level(level);
        if action == InterventionAction::None {
            return None;
        }
        let channel = select_channel(ctx, config)?;

        let allowed = match self.last[channel.index()] {
            None => true,
            Some((_, previous)) if action > previous => true,
            Some((at, _)) => now - at >= channel.cooldown(config),
        };

        if !allowed {
            self.suppressed += 1;
            log::trace!("Suppressed {} on {} channel (cooldown)", action, channel);
            return None;
        }

        self.last[channel.index()] = Some((now, action));
        self.emitted += 1;
        log::info!("Intervention {} on {} channel ({} level)", action, channel, level);

        Some(InterventionEvent {
            channel,
            severity: action,
            level,
            message: action.message().to_string(),
            actions: action.actions().iter().map(|a| a.to_string()).collect(),
            triggered_at: now,
        })
    }
}
