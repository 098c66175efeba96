use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use blackjack_arena::HistoryReporter;
use blackjack_arena_drivers::{
    chart::ChartReporter, export_to_file, format_standings, parse_config_from_file, Config,
    DriverError,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "~/.blackjack_arena.yml";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Hands each competitor plays, overriding the config file
    #[arg(long)]
    hands: Option<u32>,

    /// Seed for the decks, overriding the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Do not draw the balance chart
    #[arg(long)]
    no_chart: bool,

    /// Write the balance history and standings to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn load_config(path: &str) -> Result<Config, DriverError> {
    if path != DEFAULT_CONFIG_PATH {
        return parse_config_from_file(&PathBuf::from(path));
    }

    let home_dir = home::home_dir().ok_or(DriverError::NoHomeDirectory)?;
    let config_file_path = home_dir.join(".blackjack_arena.yml");
    if config_file_path.is_file() {
        parse_config_from_file(&config_file_path)
    } else {
        tracing::info!(
            path = %config_file_path.display(),
            "no config file found, using the built-in roster"
        );
        Ok(Config::default())
    }
}

fn run(args: CommandLineArgs) -> Result<(), DriverError> {
    let mut config = load_config(&args.config)?;
    if let Some(hands) = args.hands {
        config.tournament.hands = hands;
    }
    if args.seed.is_some() {
        config.tournament.seed = args.seed;
    }
    tracing::debug!(?config, "configuration loaded");

    let tournament = config.build_tournament()?;
    let mut history = HistoryReporter::new();
    let standings = if args.no_chart {
        tournament.run(&mut history)?
    } else {
        let mut chart = ChartReporter::new(
            io::stdout(),
            config.tournament.starting_balance,
            config.tournament.refresh_every,
        );
        tournament.run(&mut (&mut chart, &mut history))?
    };

    println!("{}", format_standings(&standings));

    if let Some(path) = args.export {
        export_to_file(&path, &history, &standings)?;
        tracing::info!(path = %path.display(), "history exported");
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = CommandLineArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "arena stopped");
            ExitCode::FAILURE
        }
    }
}
