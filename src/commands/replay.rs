use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde_json::json;

use crate::core::alertness::{AlertnessRuntime, AlertnessState, InterventionEvent, SignalKind};
use crate::core::config::{ConfigStore, FusionConfig};
use crate::core::scenario::{replay_offline, Scenario};
use crate::ui::{print_intervention, print_session_stats, print_signals, print_state};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct OutputOptions {
    json: bool,
    every: u64,
    verbose: bool,
}

impl OutputOptions {
    fn state(&self, state: &AlertnessState) {
        let due = state.shutting_down || state.tick % self.every == 0;
        if !due {
            return;
        }
        if self.json {
            println!("{}", json!({ "state": state }));
        } else {
            print_state(state);
            if self.verbose {
                print_signals(state);
            }
        }
    }

    fn intervention(&self, event: &InterventionEvent) {
        if self.json {
            println!("{}", json!({ "intervention": event }));
        } else {
            print_intervention(event);
        }
    }
}

pub fn handle_replay(matches: &clap::ArgMatches) -> Result<()> {
    let scenario_path = matches
        .get_one::<String>("scenario")
        .context("Scenario argument is required")?;
    let scenario = Scenario::load(Path::new(scenario_path))?;

    let config = resolve_config(&scenario, matches.get_one::<String>("config"))?;
    let output = OutputOptions {
        json: matches.get_flag("json"),
        every: matches.get_one::<u64>("every").copied().unwrap_or(1).max(1),
        verbose: matches.get_flag("verbose"),
    };

    if !output.json {
        let name = if scenario.name.is_empty() {
            scenario_path.as_str()
        } else {
            scenario.name.as_str()
        };
        println!(
            "{} {} ({} events, {} ms)",
            "Replaying".cyan().bold(),
            name,
            scenario.events.len(),
            scenario.end_ms()
        );
    }

    if matches.get_flag("realtime") {
        replay_realtime(&scenario, config, output)
    } else {
        let report = replay_offline(&scenario, Arc::new(config), Utc::now());
        let mut pending = report.interventions.iter().peekable();
        for state in &report.states {
            output.state(state);
            while let Some(event) = pending.next_if(|e| e.triggered_at <= state.generated_at) {
                output.intervention(event);
            }
        }
        finish(&output, &report.stats)
    }
}

/// An explicit `--config` file wins over a config embedded in the scenario,
/// which wins over the stored one.
fn resolve_config(scenario: &Scenario, file: Option<&String>) -> Result<FusionConfig> {
    if let Some(path) = file {
        if scenario.config.is_some() {
            log::warn!("Scenario config overridden by {}", path);
        }
        return ConfigStore::load_from(Path::new(path));
    }
    match &scenario.config {
        Some(config) => Ok(config.clone()),
        None => ConfigStore::load(),
    }
}

fn replay_realtime(scenario: &Scenario, config: FusionConfig, output: OutputOptions) -> Result<()> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();

    ctrlc::set_handler(move || {
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let mut runtime = AlertnessRuntime::new(config)?;
    let output = Arc::new(output);

    let for_states = Arc::clone(&output);
    runtime.on_state(move |state| for_states.state(state));
    let for_events = Arc::clone(&output);
    runtime.on_intervention(move |event| for_events.intervention(event));

    let (modalities, context) = scenario.split_by_producer();
    runtime.spawn_replay_producer("context", context);
    for (kind, events) in SignalKind::ALL.into_iter().zip(modalities) {
        runtime.spawn_replay_producer(kind.label(), events);
    }

    if !output.json {
        println!("{}", "Press Ctrl+C to stop early".dimmed());
    }

    let deadline = Instant::now() + Duration::from_millis(scenario.end_ms());
    while Instant::now() < deadline {
        if cancel_flag.load(Ordering::Relaxed) {
            if !output.json {
                println!("{}", "Stopping replay...".yellow().bold());
            }
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let stats = runtime.shutdown()?;
    finish(&output, &stats)
}

fn finish(output: &OutputOptions, stats: &crate::core::alertness::SessionStats) -> Result<()> {
    if output.json {
        println!("{}", json!({ "stats": stats }));
    } else {
        print_session_stats(stats);
    }
    Ok(())
}
