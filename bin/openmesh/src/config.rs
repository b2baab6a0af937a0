//! Layered configuration: built-in defaults, then the TOML file, then
//! `OPENMESH_` environment variables.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, address};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use openmesh_deploy::{GenesisSettings, MintSettings};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::DeploymentArgs;

/// First account of a local Anvil or Hardhat node.
const DEFAULT_SENDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenmeshConfig {
    /// Defaults to a local node.
    #[serde(alias = "rpcurl")]
    pub rpc_url: Option<Url>,
    pub sender: Address,
    /// Foundry output directory.
    pub artifacts: PathBuf,
    pub deployments: PathBuf,
    /// Overrides for the periodic sale.
    pub genesis: Option<GenesisSettings>,
    /// Overrides for the whitelist mint.
    pub mint: Option<MintSettings>,
}

impl Default for OpenmeshConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            sender: DEFAULT_SENDER,
            artifacts: PathBuf::from("out"),
            deployments: PathBuf::from("deployments"),
            genesis: None,
            mint: None,
        }
    }
}

impl OpenmeshConfig {
    /// Load the configuration, ignoring `path` if it does not exist.
    ///
    /// Environment variables use `__` between nesting levels and may spell
    /// multi-word keys with or without underscores: `OPENMESH_MINT__PUBLIC_MINT_TIME`
    /// and `OPENMESH_MINT__PUBLICMINTTIME` both set `mint.publicMintTime`.
    pub fn load(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(
                Env::prefixed("OPENMESH_")
                    .ignore(&["verbosity", "config", "redeploy"])
                    .split("__")
                    .map(|key| key.as_str().replace('_', "").into()),
            )
            .extract()
            .context(format!("Failed to load configuration from {}", path.display()))
    }

    pub fn rpc_url(&self) -> Result<Url> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_RPC_URL).context("Invalid default RPC URL"),
        }
    }

    /// Apply command line overrides.
    pub fn with_args(mut self, args: &DeploymentArgs) -> Self {
        if let Some(rpc_url) = &args.rpc_url {
            self.rpc_url = Some(rpc_url.clone());
        }
        if let Some(sender) = args.sender {
            self.sender = sender;
        }
        if let Some(artifacts) = &args.artifacts {
            self.artifacts = artifacts.clone();
        }
        if let Some(deployments) = &args.deployments {
            self.deployments = deployments.clone();
        }
        self
    }
}
