use anyhow::Result;
use clap::{Arg, ArgAction, Command};

fn main() -> Result<()> {
    let matches = Command::new("vigil")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Driver alertness fusion core")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a recorded scenario through the fusion pipeline")
                .arg(
                    Arg::new("scenario")
                        .help("Path to the scenario JSON file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Fusion config to use instead of the stored or scenario one"),
                )
                .arg(
                    Arg::new("realtime")
                        .short('r')
                        .long("realtime")
                        .help("Replay on the wall clock through the async runtime")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Emit one JSON object per line")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("every")
                        .short('e')
                        .long("every")
                        .value_name("N")
                        .help("Only print every Nth tick")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .help("Show per-modality signal details")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the fusion configuration (use 'vigil config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Show the active configuration")
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .help("Print raw JSON")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("init")
                        .about("Write the default configuration")
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite an existing config")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("validate")
                        .about("Validate a config file (defaults to the stored one)")
                        .arg(Arg::new("file").help("Config file to check").index(1)),
                )
                .subcommand(Command::new("path").about("Print the config file location")),
        )
        .subcommand(Command::new("version").about("Shows version information"))
        .get_matches();

    vigil::init_logging();

    if matches.get_flag("version") {
        return vigil::commands::version();
    }

    match matches.subcommand() {
        Some(("replay", sub_matches)) => vigil::commands::handle_replay(sub_matches)?,
        Some(("config", sub_matches)) => vigil::commands::handle_config(sub_matches)?,
        Some(("version", _)) => vigil::commands::version()?,
        _ => {
            println!("Welcome to vigil!");
            println!("Use 'vigil --help' for more information.");
        }
    }

    Ok(())
}
