use std::path::PathBuf;

use alloy_core::primitives::{Address, B256};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "Openmesh.toml";

/// Snapshot the whitelist mint pipeline saves to.
pub const MINT_SNAPSHOT: &str = "mint.json";

#[derive(Parser)]
#[command(name = "openmesh")]
#[command(
    author,
    version,
    about = "Deploy the Openmesh genesis sale contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "OPENMESH_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the TOML configuration file.
    ///
    /// Missing files are ignored. Values from `OPENMESH_*` environment variables
    /// take precedence over the file.
    #[arg(long, alias = "conf", global = true, env = "OPENMESH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy the periodic genesis sale with its token and pass.
    Deploy(DeployArgs),

    /// Deploy the whitelist mint sale with its pass.
    DeployMint(DeployMintArgs),

    /// Build the Merkle tree of a whitelist and dump it.
    Tree(TreeArgs),

    /// Print the effective configuration as TOML.
    Config(DeploymentArgs),
}

/// Options shared by the deployment commands. Each overrides the matching
/// configuration file entry.
#[derive(Debug, Clone, Parser)]
pub struct DeploymentArgs {
    /// JSON-RPC endpoint of the target chain.
    #[arg(long, alias = "rpc", env = "OPENMESH_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Account sending the deployment transactions. Must be unlocked on the node.
    #[arg(long, env = "OPENMESH_SENDER")]
    pub sender: Option<Address>,

    /// Directory containing the compiled contract artifacts.
    #[arg(long, env = "OPENMESH_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Directory the deployment snapshots are stored in.
    #[arg(long, env = "OPENMESH_DEPLOYMENTS")]
    pub deployments: Option<PathBuf>,

    /// Whether to redeploy.
    ///
    /// `--redeploy false` reuses the stored snapshot when there is one. Omitting
    /// the flag, or passing `--redeploy`, always deploys and overwrites the
    /// snapshot.
    #[arg(long, env = "OPENMESH_REDEPLOY", num_args = 0..=1, default_missing_value = "true")]
    pub redeploy: Option<bool>,

    /// Simulate the deployment without touching the chain or the snapshot directory.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct DeployArgs {
    #[clap(flatten)]
    pub deployment: DeploymentArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct DeployMintArgs {
    #[clap(flatten)]
    pub deployment: DeploymentArgs,

    /// Root of the whitelist Merkle tree.
    #[arg(long, env = "OPENMESH_WHITELIST_ROOT", conflicts_with = "whitelist")]
    pub whitelist_root: Option<B256>,

    /// Whitelist file to compute the root from instead of `--whitelist-root`.
    #[arg(long)]
    pub whitelist: Option<PathBuf>,

    /// Unix time from which anyone may mint.
    #[arg(long, env = "OPENMESH_PUBLIC_MINT_TIME")]
    pub public_mint_time: Option<u32>,
}

#[derive(Debug, Clone, Parser)]
pub struct TreeArgs {
    /// JSON array of `{ "account", "mintTime" }` entries.
    pub whitelist: PathBuf,

    /// Where to write the tree dump.
    #[arg(short, long, default_value = "tree.json")]
    pub out: PathBuf,
}
