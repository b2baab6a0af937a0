//! openmesh is a CLI tool to deploy the Openmesh genesis sale contracts.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DeployMintArgs, DeploymentArgs, MINT_SNAPSHOT, TreeArgs};
use config::OpenmeshConfig;
use openmesh_deploy::{
    ArtifactStore, DeploymentBackend, DeploymentSnapshot, DeploymentStore, Deployer, FileStore,
    LATEST_SNAPSHOT, MemoryStore, MerkleTreeBuilder, MintSettings, MintWindow, RpcBackend,
    SimulatedBackend, StandardMerkleTree, StandardTreeBuilder,
    contracts::{genesis, mint},
    units::now,
    whitelist::read_whitelist,
};

/// A deployment pipeline ending in a named snapshot.
enum Pipeline {
    Genesis,
    Mint(MintSettings),
}

impl Pipeline {
    fn snapshot(&self) -> &'static str {
        match self {
            Pipeline::Genesis => LATEST_SNAPSHOT,
            Pipeline::Mint(_) => MINT_SNAPSHOT,
        }
    }

    async fn run<B, S>(
        self,
        mut deployer: Deployer<B, S>,
        config: &OpenmeshConfig,
        redeploy: Option<bool>,
    ) -> Result<DeploymentSnapshot>
    where
        B: DeploymentBackend,
        S: DeploymentStore,
    {
        let name = self.snapshot();
        match self {
            Pipeline::Genesis => {
                let settings = config.genesis.clone();
                let deployment = deployer
                    .load_or_deploy(name, redeploy, async move |deployer| {
                        genesis::resolve(deployer, settings).await
                    })
                    .await?;
                DeploymentSnapshot::from_deployment(&deployment)
            }
            Pipeline::Mint(settings) => {
                let deployment = deployer
                    .load_or_deploy(name, redeploy, async move |deployer| {
                        mint::resolve(deployer, Some(settings)).await
                    })
                    .await?;
                DeploymentSnapshot::from_deployment(&deployment)
            }
        }
    }
}

async fn deploy(pipeline: Pipeline, args: &DeploymentArgs, config: OpenmeshConfig) -> Result<()> {
    let config = config.with_args(args);

    let snapshot = if args.dry_run {
        tracing::info!(sender = %config.sender, "Dry run, nothing will be deployed or saved");
        let deployer = Deployer::new(SimulatedBackend::new(config.sender), MemoryStore::new());
        pipeline.run(deployer, &config, args.redeploy).await?
    } else {
        let rpc_url = config.rpc_url()?;
        tracing::info!(
            rpc_url = %rpc_url,
            sender = %config.sender,
            artifacts = %config.artifacts.display(),
            deployments = %config.deployments.display(),
            "Deploying contracts..."
        );
        let backend = RpcBackend::new(
            rpc_url,
            config.sender,
            ArtifactStore::new(config.artifacts.clone()),
        )?;
        let deployer = Deployer::new(backend, FileStore::new(config.deployments.clone()));
        pipeline.run(deployer, &config, args.redeploy).await?
    };

    println!("{snapshot}");
    Ok(())
}

/// Merge the command line mint inputs over the configuration file.
fn mint_settings(args: &DeployMintArgs, config: &OpenmeshConfig) -> Result<MintSettings> {
    let mut settings = config.mint.clone().unwrap_or_default();

    if let Some(path) = &args.whitelist {
        let entries = read_whitelist(path)?;
        let tree = StandardTreeBuilder.build(&entries)?;
        tracing::info!(
            whitelist = %path.display(),
            entries = entries.len(),
            root = %tree.root,
            "Computed whitelist root"
        );
        settings.whitelist_root = Some(tree.root);
    }
    if let Some(root) = args.whitelist_root {
        settings.whitelist_root = Some(root);
    }
    if let Some(public_mint_time) = args.public_mint_time {
        settings.public_mint_time = Some(public_mint_time);
    }

    if let Some(public_mint_time) = settings.public_mint_time
        && (MintWindow { public_mint_time }).can_public_mint(now())
    {
        tracing::warn!(public_mint_time, "Public mint time is in the past, the whitelist will have no effect");
    }

    Ok(settings)
}

fn tree(args: &TreeArgs) -> Result<()> {
    let entries = read_whitelist(&args.whitelist)?;
    let tree = StandardMerkleTree::of(&entries)?;

    let dump = serde_json::to_string_pretty(&tree.dump()).context("Failed to serialize tree")?;
    std::fs::write(&args.out, dump)
        .context(format!("Failed to write tree to {}", args.out.display()))?;

    tracing::info!(
        entries = tree.len(),
        out = %args.out.display(),
        "Whitelist tree written"
    );
    println!("{}", tree.root());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Deploy(args) => {
            let config = OpenmeshConfig::load(&cli.config)?;
            deploy(Pipeline::Genesis, &args.deployment, config).await
        }
        Command::DeployMint(args) => {
            let config = OpenmeshConfig::load(&cli.config)?;
            let settings = mint_settings(&args, &config)?;
            deploy(Pipeline::Mint(settings), &args.deployment, config).await
        }
        Command::Tree(args) => tree(&args),
        Command::Config(args) => {
            let config = OpenmeshConfig::load(&cli.config)?.with_args(&args);
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}
