use std::{error::Error, path::PathBuf, process, sync::Arc};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use tokio::{sync::mpsc, task::JoinHandle};

use cloudtune::{
    catalog::{Catalog, Library, Request},
    config::{Config, PlayerConfig},
    player::Player,
    session::{Handle, Session},
    signal,
    ticker::Ticker,
    transport::Loopback,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when built in release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Name of the player started when the configuration lists none.
const DEFAULT_PLAYER: &str = "default";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, PartialEq, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    ///
    /// Reread on SIGHUP. Without one, the defaults apply.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, env = "CLOUDTUNE_CONFIG")]
    config: Option<PathBuf>,

    /// Track library
    ///
    /// Overrides the library of the configuration file.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    library: Option<PathBuf>,

    /// Next track timing in seconds
    ///
    /// Positive values advance after the natural end of a track, negative
    /// values before it. Overrides the configuration file.
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    offset: Option<i64>,

    /// Play this on every player at startup
    ///
    /// A search keyword, a catalog URI like `cloudmusic://163/my/daily`, or
    /// a URL.
    #[arg(short, long, value_name = "REQUEST")]
    play: Option<String>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// Command line arguments take precedence over `RUST_LOG`, which takes
/// precedence over the default of `info`.
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(args: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if args.quiet || args.verbose > 0 {
        let level = match args.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("cloudtune", level);
    }

    logger.init();
}

/// Loads the configuration and applies the command line overrides.
fn load_config(args: &Args) -> cloudtune::error::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };

    if let Some(offset) = args.offset {
        config.next_track_timing = offset;
    }
    if args.library.is_some() {
        config.library.clone_from(&args.library);
    }

    Ok(config)
}

fn load_library(config: &Config) -> cloudtune::error::Result<Library> {
    match &config.library {
        Some(path) => Library::load(path),
        None => {
            warn!("no library configured; only URLs will play");
            Ok(Library::default())
        }
    }
}

/// Spawns a session for every configured player.
fn spawn_players(
    config: &Config,
    catalog: &Arc<dyn Catalog>,
) -> (Vec<Handle>, Vec<JoinHandle<Player>>) {
    let players = if config.players.is_empty() {
        vec![PlayerConfig::named(DEFAULT_PLAYER)]
    } else {
        config.players.clone()
    };

    players
        .iter()
        .map(|player| {
            let (event_tx, mut event_rx) = mpsc::unbounded_channel();
            let name = player.name.clone();
            tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    debug!("{name}: {event:?}");
                }
            });

            let player = Player::new(
                &player.name,
                Arc::new(Loopback::new()),
                Arc::clone(catalog),
                config.next_track_timing,
            )
            .with_volume(player.volume)
            .with_events(event_tx);

            Session::spawn(player)
        })
        .unzip()
}

/// Main application loop.
///
/// Runs the players until interrupted or terminated, rereading the
/// configuration on SIGHUP.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;
    let catalog: Arc<dyn Catalog> = Arc::new(load_library(&config)?);

    let (handles, sessions) = spawn_players(&config, &catalog);
    let mut ticker = Ticker::install(config.tick_interval, handles.clone());

    if let Some(play) = &args.play {
        let request: Request = play.parse()?;
        for handle in &handles {
            match handle.play(request.clone()).await {
                Ok(track) => info!("{}: playing {track}", handle.name()),
                Err(e) => error!("{}: {e}", handle.name()),
            }
        }
    }

    let mut signals = signal::Handler::new()?;
    loop {
        let signal = signals.recv().await;
        if signal.is_shutdown() {
            info!("received {signal}, shutting down gracefully");
            break;
        }

        info!("received {signal}, reloading configuration");
        match load_config(&args) {
            Ok(config) => {
                for handle in &handles {
                    if let Err(e) = handle.set_timing_offset(config.next_track_timing).await {
                        error!("{}: {e}", handle.name());
                    }
                }
                if config.tick_interval != ticker.interval() {
                    ticker.reconfigure(config.tick_interval, handles.clone());
                }
            }
            Err(e) => error!("keeping previous configuration: {e}"),
        }
    }

    ticker.shutdown().await;
    for handle in &handles {
        if let Err(e) = handle.stop().await {
            warn!("{}: {e}", handle.name());
        }
    }

    // Sessions end once their last handle is gone.
    drop(handles);
    for session in sessions {
        let player = session.await?;
        debug!("{} stopped at {}s", player.name(), player.position());
    }

    Ok(())
}

/// Main entry point of the application.
#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    debug!("Command {args:#?}");

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
