// UI and formatting module

pub mod formatters;

pub use formatters::{
    colorize_level, format_state_line, format_time, print_config_summary, print_intervention,
    print_session_stats, print_signals, print_state, score_bar,
};
