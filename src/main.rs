//! Binary entrypoint for the mineclick CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and export the standard catalog
//! - `status` - print store and catalog summary
//! - `click`, `attack`, `craft`, `use`, ... - run one engine operation and print the outcome as JSON
//! - `serve` - run the boss reset scheduler until Ctrl-C
//!
//! The chat adapter is expected to call the library directly; this binary is for
//! operators and smoke tests.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use mineclick::config::Config;
use mineclick::game::{
    save_catalog_to_json, Game, LeaderboardKind, MineStore, PlayerId, QuestPeriod, SellAmount,
};
use mineclick::scheduler::BossResetScheduler;

#[derive(Parser)]
#[command(name = "mineclick")]
#[command(about = "Progression engine for a chat-driven mining game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Daily,
    Weekly,
}

impl From<PeriodArg> for QuestPeriod {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Daily => QuestPeriod::Daily,
            PeriodArg::Weekly => QuestPeriod::Weekly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BoardArg {
    Level,
    Gold,
    Achievements,
    Quests,
    Tools,
    Resource,
    Total,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and catalog seed
    Init,
    /// Show store and catalog summary
    Status,
    /// Mine once
    Click { player: PlayerId },
    /// List the current quest set
    Quests {
        player: PlayerId,
        #[arg(value_enum, default_value = "daily")]
        period: PeriodArg,
    },
    /// Show achievement progress
    Achievements { player: PlayerId },
    /// Attack a boss with rolled damage
    Attack { player: PlayerId, boss: String },
    /// Craft a recipe
    Craft { player: PlayerId, recipe: String },
    /// Use a crafted key item
    Use { player: PlayerId, item: String },
    /// Buy one level of an upgrade
    BuyUpgrade { player: PlayerId, upgrade: String },
    /// Buy a pickaxe
    BuyTool { player: PlayerId, tool: String },
    /// Spend resources on a pickaxe level
    UpgradeTool { player: PlayerId, tool: String },
    /// Switch the active pickaxe
    Equip { player: PlayerId, tool: String },
    /// Move to another mine
    Travel { player: PlayerId, location: String },
    /// Sell one unit, or all with --all
    Sell {
        player: PlayerId,
        resource: String,
        #[arg(long)]
        all: bool,
    },
    /// Show a player's profile
    Profile { player: PlayerId },
    /// Top players
    Leaderboard {
        #[arg(value_enum, default_value = "level")]
        kind: BoardArg,
        /// Resource id for the `resource` board
        #[arg(long)]
        resource: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the boss reset scheduler until Ctrl-C
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new mineclick configuration");
        Config::create_default(&cli.config).await?;
        let config = Config::default();
        let seed = std::path::Path::new(&config.storage.data_dir).join("catalog.json");
        save_catalog_to_json(&config.storage.load_catalog()?, &seed)?;
        println!("Wrote {} and {}", cli.config, seed.display());
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    config.validate()?;
    init_logging(&Some(config.clone()), cli.verbose);

    let catalog = Arc::new(config.storage.load_catalog()?);
    let store = MineStore::open(config.storage.db_path())?;
    let game = Arc::new(Game::new(store, catalog, config.game.clone())?);

    match cli.command {
        // handled before the store is opened
        Commands::Init => {}
        Commands::Status => {
            let players = game.store().list_player_ids()?.len();
            let last_reset = game.last_boss_reset()?;
            print_json(&serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "db_path": config.storage.db_path(),
                "players": players,
                "locations": game.catalog().locations.len(),
                "bosses": game.catalog().bosses.len(),
                "recipes": game.catalog().recipes.len(),
                "last_boss_reset": last_reset,
                "recent_events": game.store().recent_events(5)?,
            }))?;
        }
        Commands::Click { player } => print_json(&game.resolve_click(player)?)?,
        Commands::Quests { player, period } => print_json(&game.list_quests(player, period.into())?)?,
        Commands::Achievements { player } => print_json(&game.achievements_view(player)?)?,
        Commands::Attack { player, boss } => print_json(&game.attack_boss(player, &boss)?)?,
        Commands::Craft { player, recipe } => print_json(&game.craft(player, &recipe)?)?,
        Commands::Use { player, item } => print_json(&game.use_item(player, &item)?)?,
        Commands::BuyUpgrade { player, upgrade } => print_json(&game.buy_upgrade(player, &upgrade)?)?,
        Commands::BuyTool { player, tool } => print_json(&game.buy_tool(player, &tool)?)?,
        Commands::UpgradeTool { player, tool } => print_json(&game.upgrade_tool(player, &tool)?)?,
        Commands::Equip { player, tool } => {
            game.set_active_tool(player, &tool)?;
            print_json(&game.profile(player)?)?;
        }
        Commands::Travel { player, location } => {
            game.travel(player, &location)?;
            print_json(&game.profile(player)?)?;
        }
        Commands::Sell { player, resource, all } => {
            let amount = if all { SellAmount::All } else { SellAmount::One };
            print_json(&game.sell_resource(player, &resource, amount)?)?;
        }
        Commands::Profile { player } => print_json(&game.profile(player)?)?,
        Commands::Leaderboard { kind, resource, limit } => {
            let kind = match kind {
                BoardArg::Level => LeaderboardKind::Level,
                BoardArg::Gold => LeaderboardKind::Gold,
                BoardArg::Achievements => LeaderboardKind::Achievements,
                BoardArg::Quests => LeaderboardKind::Quests,
                BoardArg::Tools => LeaderboardKind::Tools,
                BoardArg::Total => LeaderboardKind::TotalResources,
                BoardArg::Resource => LeaderboardKind::Resource(
                    resource.ok_or_else(|| anyhow!("--resource is required for the resource board"))?,
                ),
            };
            print_json(&game.leaderboard(&kind, limit)?)?;
        }
        Commands::Serve => {
            info!("Starting mineclick v{}", env!("CARGO_PKG_VERSION"));
            let scheduler = BossResetScheduler::new(Arc::clone(&game), config.scheduler.clone());
            let status = scheduler
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
            print_json(&status)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let file = config.as_ref().and_then(|c| c.logging.file.clone()).and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stderr);
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
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
