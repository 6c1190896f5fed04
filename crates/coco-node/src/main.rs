//! # cocod
//!
//! Node binary for the CoCo chain.
//!
//! ## Commands
//!
//! - `cocod init` writes `config.toml` and `genesis.json` under the home
//! - `cocod start` replays genesis and produces local blocks
//! - `cocod perms` prints the module account permission table
//! - `cocod order` prints the phase and keeper orderings
//!
//! Any assembly error aborts the process before a block is produced.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use coco_node::app::keepers::keeper_order;
use coco_node::app::{AppOptions, CocoApp};
use coco_node::container::{
    config_path, default_home, genesis_path, load_config, startup_log_level, NodeConfig,
};
use coco_node::driver::BlockDriver;
use coco_node::genesis::{GenesisBuilder, GenesisDoc};
use shared_types::Phase;

/// CoCo chain node
#[derive(Parser, Debug)]
#[command(name = "cocod")]
#[command(about = "CoCo application chain node", version)]
struct Cli {
    /// Node home directory (default: $HOME/.cocod)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write default config and genesis
    Init {
        #[arg(long, default_value = "coco-devnet")]
        chain_id: String,

        /// Moniker of the development validator
        #[arg(long, default_value = "dev")]
        moniker: String,

        #[arg(long, default_value_t = 1_000_000_000)]
        balance: u64,

        #[arg(long, default_value_t = 100_000_000)]
        self_bond: u64,

        /// Overwrite existing files
        #[arg(long)]
        overwrite: bool,
    },
    /// Run InitChain and produce local blocks
    Start,
    /// Print module account permissions
    Perms,
    /// Print phase and keeper orders
    Order,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn app_options(config: &NodeConfig) -> AppOptions {
    AppOptions {
        inv_check_period: config.chain.inv_check_period,
        skip_upgrade_heights: config.upgrade.skip_heights.clone(),
        ..AppOptions::default()
    }
}

fn assemble(config: &NodeConfig) -> Result<CocoApp> {
    CocoApp::new(&config.chain.app_name, &app_options(config))
        .context("Failed to assemble application")
}

fn cmd_init(
    home: &Path,
    chain_id: String,
    moniker: &str,
    balance: u64,
    self_bond: u64,
    overwrite: bool,
) -> Result<()> {
    let genesis_file = genesis_path(home);
    if genesis_file.exists() && !overwrite {
        bail!("{} already exists (use --overwrite)", genesis_file.display());
    }

    let config = NodeConfig {
        chain: coco_node::container::ChainConfig {
            chain_id: chain_id.clone(),
            ..Default::default()
        },
        ..Default::default()
    };
    config.validate().context("Invalid config")?;
    let app = assemble(&config)?;

    let genesis = app
        .default_genesis()
        .context("Failed to build default genesis")?;
    let doc = GenesisBuilder::new(chain_id, genesis)
        .with_dev_validator(moniker, balance, self_bond)
        .context("Failed to add dev validator")?
        .build()
        .context("Failed to build genesis")?;

    config
        .save(&config_path(home))
        .context("Failed to write config")?;
    doc.save(&genesis_file).context("Failed to write genesis")?;
    info!("Initialized {} in {}", doc.chain_id, home.display());
    Ok(())
}

async fn cmd_start(home: &Path, config: NodeConfig) -> Result<()> {
    let doc = GenesisDoc::load(&genesis_path(home)).context("Failed to load genesis")?;
    if doc.chain_id != config.chain.chain_id {
        bail!(
            "genesis chain id {} does not match config chain id {}",
            doc.chain_id,
            config.chain.chain_id
        );
    }

    let mut app = assemble(&config)?;
    let request = doc.to_request().context("Failed to encode genesis")?;
    let response = app.init_chain(&request).context("InitChain failed")?;
    info!(
        "Chain {} initialized with {} validators",
        doc.chain_id,
        response.validators.len()
    );

    let mut driver = BlockDriver::new(app, config.driver.clone(), config.chain.halt_height);
    info!("Node is running. Press Ctrl+C to stop.");
    let summary = driver
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Block production stopped")?;

    info!(
        "Stopped ({:?}) after {} blocks at height {}, app hash {}",
        summary.reason,
        summary.blocks,
        summary.last_height,
        hex::encode(summary.last_app_hash)
    );
    Ok(())
}

fn cmd_perms(config: &NodeConfig) -> Result<()> {
    let app = assemble(config)?;
    let prefixes = shared_types::AddressPrefixes::default();
    println!(
        "prefixes: account {}, validator {}, consensus {}",
        prefixes.account_addr, prefixes.validator_addr, prefixes.consensus_addr
    );
    let blocked = app.blocked_module_addrs();
    for (name, perms) in app.get_macc_perms() {
        let addr = shared_types::AccAddress::for_module(&name);
        let perms: Vec<String> = perms.iter().map(|p| p.to_string()).collect();
        println!(
            "{:<24} {} [{}]{}",
            name,
            addr,
            perms.join(", "),
            if blocked.contains(&addr) { "" } else { " receiving" }
        );
    }
    Ok(())
}

fn cmd_order(config: &NodeConfig) -> Result<()> {
    let app = assemble(config)?;
    let manager = app.manager();
    println!("modules:      {}", manager.module_names().join(", "));
    println!("keepers:      {}", keeper_order()?.join(", "));
    for phase in [Phase::InitGenesis, Phase::BeginBlock, Phase::EndBlock] {
        println!("{:<13} {}", format!("{phase}:"), manager.order(phase).join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = cli.home.clone().unwrap_or_else(default_home);

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| startup_log_level(&home));
    init_logging(&level)?;

    let config = match &cli.command {
        Command::Init { .. } => NodeConfig::default(),
        _ => load_config(&home).context("Failed to load config")?,
    };

    match cli.command {
        Command::Init {
            chain_id,
            moniker,
            balance,
            self_bond,
            overwrite,
        } => cmd_init(&home, chain_id, &moniker, balance, self_bond, overwrite),
        Command::Start => cmd_start(&home, config).await,
        Command::Perms => cmd_perms(&config),
        Command::Order => cmd_order(&config),
    }
}
