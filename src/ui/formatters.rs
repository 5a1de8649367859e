use chrono::{DateTime, Local, Utc};
use colored::*;

use crate::core::alertness::{
    AlertLevel, AlertnessState, InterventionAction, InterventionEvent, SessionStats,
    TrendDirection,
};
use crate::core::config::FusionConfig;

/// Local wall-clock time with millisecond precision (HH:MM:SS.mmm)
pub fn format_time(at: DateTime<Utc>) -> String {
    let local: DateTime<Local> = at.into();
    local.format("%H:%M:%S%.3f").to_string()
}

pub fn colorize_level(level: AlertLevel) -> ColoredString {
    let label = level.label().to_uppercase();
    match level {
        AlertLevel::Normal => label.green(),
        AlertLevel::Mild => label.yellow(),
        AlertLevel::Moderate => label.truecolor(255, 140, 0),
        AlertLevel::Severe => label.red().bold(),
    }
}

pub fn trend_arrow(direction: TrendDirection) -> ColoredString {
    match direction {
        TrendDirection::Improving => "↑".green(),
        TrendDirection::Stable => "→".normal(),
        TrendDirection::Declining => "↓".red(),
    }
}

/// Text bar of `width` cells for a 0-100 score.
pub fn score_bar(score: f64, width: usize) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled.min(width)))
}

/// One line per tick.
pub fn format_state_line(state: &AlertnessState) -> String {
    let mut line = format!(
        "{} #{:<5} {} {:>5.1} (raw {:>5.1}) {:<10} {} {:>5.1}",
        format_time(state.generated_at).dimmed(),
        state.tick,
        score_bar(state.smoothed_score, 20),
        state.smoothed_score,
        state.raw_score,
        colorize_level(state.level),
        trend_arrow(state.trend.direction),
        state.trend.forecast_score,
    );
    if state.degraded {
        line.push_str(&format!(" {}", "[degraded]".yellow()));
    }
    if state.shutting_down {
        line.push_str(&format!(" {}", "[shutdown]".dimmed()));
    }
    line
}

pub fn print_state(state: &AlertnessState) {
    println!("{}", format_state_line(state));
}

pub fn print_intervention(event: &InterventionEvent) {
    let header = format!("[{} / {}]", event.channel, event.severity);
    let header = match event.severity {
        InterventionAction::UrgentAlert => header.red().bold(),
        InterventionAction::ActiveAlert => header.truecolor(255, 140, 0).bold(),
        _ => header.yellow(),
    };
    println!("  {} {}", header, event.message);
    for action in &event.actions {
        println!("      {} {}", "-".dimmed(), action.dimmed());
    }
}

pub fn print_signals(state: &AlertnessState) {
    for s in &state.signals {
        let status = if s.fresh { "fresh".green() } else { "stale".yellow() };
        let value = s
            .value
            .map_or_else(|| "   -".to_string(), |v| format!("{:.2}", v));
        let adjusted = s
            .adjusted_value
            .map_or_else(|| "   -".to_string(), |v| format!("{:.2}", v));
        println!(
            "    {:<14} {} value {} adj {} weight {:.2}",
            s.kind.label(),
            status,
            value,
            adjusted,
            s.effective_weight
        );
    }
}

pub fn print_session_stats(stats: &SessionStats) {
    println!("\n{}", "SESSION SUMMARY".bold().bright_cyan());
    println!("{}", "=".repeat(60));
    println!("  {:<22} {}", "Ticks:".bold(), stats.ticks);
    println!(
        "  {:<22} {:.1} (min {:.1}, max {:.1}, std {:.1})",
        "Alertness score:".bold(),
        stats.mean_score,
        stats.min_score,
        stats.max_score,
        stats.std_dev()
    );
    println!("  {:<22} {}", "Level changes:".bold(), stats.level_changes);
    println!(
        "  {:<22} {:.1}%",
        "Degraded time:".bold(),
        stats.degraded_percentage()
    );
    println!(
        "  {:<22} {} (visual {}, voice {})",
        "Interventions:".bold(),
        stats.interventions(),
        stats.visual_interventions,
        stats.voice_interventions
    );
    println!("\n  {}", "Time in level".bold());
    for level in AlertLevel::ALL {
        let pct = stats.level_percentage(level);
        println!(
            "    {:<10} {} {:>5.1}%",
            colorize_level(level),
            score_bar(pct, 20),
            pct
        );
    }
}

pub fn print_config_summary(config: &FusionConfig) {
    println!("\n{}", "FUSION CONFIGURATION".bold().bright_cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {:<22} drowsiness {:.2}, distraction {:.2}, voice {:.2}",
        "Weights:".bold(),
        config.weights.drowsiness,
        config.weights.distraction,
        config.weights.voice_fatigue
    );
    println!(
        "  {:<22} alpha {:.2}, tick {} ms",
        "Smoothing:".bold(),
        config.smoothing_alpha,
        config.tick_interval_ms
    );
    println!(
        "  {:<22} normal >= {:.0}, mild >= {:.0}, moderate >= {:.0}, hysteresis {:.1}",
        "Levels:".bold(),
        config.levels.normal,
        config.levels.mild,
        config.levels.moderate,
        config.levels.hysteresis
    );
    println!(
        "  {:<22} lookback {:.0}s, horizon {:.0}s",
        "Forecast:".bold(),
        config.forecast.lookback_secs,
        config.forecast.horizon_secs
    );
    println!(
        "  {:<22} visual {:.0}s, voice {:.0}s, visual above {:.0} km/h",
        "Cooldowns:".bold(),
        config.intervention.visual_cooldown_secs,
        config.intervention.voice_cooldown_secs,
        config.intervention.speed_threshold_high
    );
}
