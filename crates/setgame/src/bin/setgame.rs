//! # SETGAME Binary
//!
//! Headless game. Computer players press random keys; human players are
//! driven from stdin, one `<player> <slot>` pair per line.
//!
//! Run with: `RUST_LOG=debug cargo run --bin setgame -- --players 4 --humans 1`

use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use pico_args::Arguments;
use setgame::{parse_press, ActionSender, Game, Press};
use setgame_shared::{FeatureOracle, GameConfig, TracingPresentation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HELP: &str = "\
Play Set with dealer and player threads around a shared table

USAGE:
  setgame [OPTIONS]

OPTIONS:
  --config     PATH        TOML config file            [default: built-in defaults]
  --players    N           Number of players           [default: from config]
  --humans     N           Players read from stdin     [default: from config]
  --seed       N           Shuffle and input seed      [default: from config or clock]

FLAGS:
  --hints                  Log every set on the table after each deal
  -h, --help               Print help information

INPUT:
  <player> <slot>          One line per key press, e.g. `0 7`

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g. `info`, `setgame=debug`)
";

struct Args {
    config: Option<PathBuf>,
    players: Option<usize>,
    humans: Option<usize>,
    seed: Option<u64>,
    hints: bool,
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "setgame failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn parse_args() -> Result<Option<Args>, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(None);
    }

    let args = Args {
        config: pargs.opt_value_from_str("--config")?,
        players: pargs.opt_value_from_str("--players")?,
        humans: pargs.opt_value_from_str("--humans")?,
        seed: pargs.opt_value_from_str("--seed")?,
        hints: pargs.contains("--hints"),
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        tracing::warn!(?rest, "ignoring unknown arguments");
    }
    Ok(Some(args))
}

fn load_config(args: &Args) -> Result<GameConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(players) = args.players {
        config.players = players;
    }
    if let Some(humans) = args.humans {
        config.human_players = humans;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.hints |= args.hints;
    Ok(config)
}

fn run() -> Result<(), Box<dyn Error>> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };
    let config = load_config(&args)?;
    let humans = config.human_players;
    let oracle = FeatureOracle::new(config.feature_size, config.feature_count);

    let game = Game::start(config, Arc::new(oracle), Arc::new(TracingPresentation::new()))?;

    // Catching signals for a graceful end: winners are still announced.
    let shutdown = game.shutdown();
    ctrlc::set_handler(move || shutdown.trigger())?;

    if humans > 0 {
        let senders = (0..humans)
            .map(|player| game.sender(player))
            .collect::<Result<Vec<_>, _>>()?;
        // Detached: a blocking stdin read cannot be interrupted, and the
        // process exits once the game is joined.
        thread::Builder::new()
            .name(String::from("stdin"))
            .spawn(move || read_presses(&senders))?;
    }

    let summary = game.join()?;
    println!("scores:  {:?}", summary.scores);
    println!("winners: {:?}", summary.winners);
    Ok(())
}

/// Forwards `<player> <slot>` lines to human players until stdin closes.
fn read_presses(senders: &[ActionSender]) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let Some((player, slot)) = parse_press(&line) else {
            tracing::warn!(%line, "expected `<player> <slot>`");
            continue;
        };
        let Some(sender) = senders.get(player) else {
            tracing::warn!(player, "not a human player");
            continue;
        };
        match sender.press(slot) {
            Press::Queued => {}
            Press::Dropped => tracing::debug!(player, slot, "queue full, press dropped"),
            Press::Closed => break,
        }
    }
}
