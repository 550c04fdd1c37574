//! Binary entrypoint for the Gloomhold CLI.
//!
//! Commands:
//! - `init` - write a starter `gloomhold.toml`
//! - `generate [--seed <n>] [--rooms <n>] [--force]` - build and save a world, then report on it
//! - `status` - summarise the saved world and game state
//! - `start` - run the world dispatcher until Ctrl-C, saving on the way out
//!
//! See the library crate docs for module-level details: `gloomhold::`.
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use gloomhold::config::Config;
use gloomhold::game::minimap::Minimap;
use gloomhold::game::persistence::StatePersistence;
use gloomhold::game::server::{bootstrap, WorldServer};
use gloomhold::game::state::GameState;
use gloomhold::world::generate_world;

#[derive(Parser)]
#[command(name = "gloomhold")]
#[command(about = "A procedurally generated multi-user dungeon world")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "gloomhold.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the world until interrupted
    Start,
    /// Write a default configuration file
    Init,
    /// Generate a world and write it to the data directory
    Generate {
        /// Seed overriding the configured one
        #[arg(short, long)]
        seed: Option<u64>,
        /// Room count overriding the configured one
        #[arg(short, long)]
        rooms: Option<usize>,
        /// Replace an existing world (discards saved state)
        #[arg(short, long)]
        force: bool,
    },
    /// Show world and game state statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting Gloomhold v{}", env!("CARGO_PKG_VERSION"));
            let (engine, persistence) = bootstrap(&config)?;

            let (out_tx, mut out_rx) = mpsc::unbounded_channel();
            let (server, handle) = WorldServer::new(engine, Some(persistence), out_tx);
            let dispatcher = tokio::spawn(server.run());
            // Headless: no transport attached, so broadcasts only reach the log.
            tokio::spawn(async move {
                while let Some(delivery) = out_rx.recv().await {
                    debug!("-> {} [{:?}] {}", delivery.session_id, delivery.kind, delivery.text);
                }
            });

            tokio::signal::ctrl_c().await?;
            info!("Interrupt received, saving and shutting down");
            handle.shutdown().await;
            dispatcher.await?;
        }
        Commands::Init => {
            if std::path::Path::new(&cli.config).exists() {
                bail!("{} already exists", cli.config);
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Generate { seed, rooms, force } => {
            let mut config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            if let Some(seed) = seed {
                config.world.seed = Some(seed);
            }
            if let Some(rooms) = rooms {
                config.world.room_count = rooms;
            }
            config.validate()?;

            let persistence = StatePersistence::new(config.persistence.data_path());
            if persistence.world_path().exists() && !force {
                bail!(
                    "{} already exists; pass --force to replace it",
                    persistence.world_path().display()
                );
            }
            let mut rng = match config.world.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let generated = generate_world(&config, &mut rng);
            persistence.save_world(&generated.world)?;
            if persistence.state_path().exists() {
                std::fs::remove_file(persistence.state_path())?;
                info!("Discarded saved state for the previous world");
            }

            let world = &generated.world;
            let state = GameState::new_for(world);
            println!("Rooms:            {}", world.room_count());
            println!("Fully reachable:  {}", world.is_fully_reachable());
            println!("Forced links:     {}", generated.forced_links);
            println!("Below target:     {}", generated.below_target);
            println!("Items placed:     {}", generated.items_placed);
            println!("Gold on floors:   {}", state.gold_in_circulation());
            for lock in &generated.locks {
                println!(
                    "Lock {:8} {} {} -> {}, {} in {} ({} steps)",
                    lock.lock_id,
                    lock.room_id,
                    lock.direction,
                    lock.destination,
                    lock.key_name,
                    lock.key_room_id,
                    lock.key_distance
                );
            }
            println!();
            println!("{}", Minimap::render(world, &state, &world.starting_room_id));
            println!("{}", Minimap::legend());
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let persistence = StatePersistence::new(config.persistence.data_path());
            match persistence.load_world()? {
                Some(world) => println!(
                    "World: {} rooms, start {}, {} locked exits",
                    world.room_count(),
                    world.starting_room_id,
                    world.locked_exits().count()
                ),
                None => println!("World: not generated yet"),
            }
            match persistence.load()? {
                Some(state) => {
                    println!(
                        "State: saved {}",
                        state
                            .last_saved
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "never".to_string())
                    );
                    println!("Players held: {}", state.players.len());
                    println!("Ghosts:       {}", state.ghost_locations.len());
                    println!("Doors opened: {}", state.unlocked_locks.len());
                    println!("Gold:         {}", state.gold_in_circulation());
                }
                None => println!("State: none saved"),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only in the foreground
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
