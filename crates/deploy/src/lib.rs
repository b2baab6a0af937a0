//! openmesh-deploy - Deployment orchestration for the Openmesh genesis contracts.
//!
//! This crate resolves the contracts of the Openmesh genesis sale (OpenToken,
//! ValidatorPass and the OpenmeshGenesis sale itself) in dependency order,
//! deploys each step at most once per run, and persists the resulting addresses
//! so later runs can reuse them.

pub mod artifact;
pub mod backend;
pub mod context;
pub mod contracts;
mod deployer;
pub mod price;
mod rpc;
pub mod settings;
pub mod store;
pub mod units;
pub mod whitelist;

pub use artifact::{ArtifactStore, ContractArtifact};
pub use backend::{
    DEFAULT_RECEIPT_TIMEOUT, DeployRequest, DeploymentBackend, RpcBackend, SimulatedBackend,
    SimulatedDeployment,
};
pub use context::{ContextGuard, ContextStack};
pub use contracts::{
    Contract, GenesisDeployment, GenesisSettings, MintDeployment, MintSettings,
    OpenTokenDeployment, OpenTokenSettings, ValidatorPassDeployment, ValidatorPassSettings,
};
pub use deployer::{DeployStep, DeployedArtifact, Deployer, StepKey};
pub use price::{PricePeriod, PriceSchedule};
pub use settings::{Merge, StepOptions};
pub use store::{DeploymentSnapshot, DeploymentStore, FileStore, LATEST_SNAPSHOT, MemoryStore};
pub use whitelist::{
    MerkleTree, MerkleTreeBuilder, MintWindow, StandardMerkleTree, StandardTreeBuilder,
    WhitelistEntry,
};
