//! Backends that perform the actual contract deployment.

use std::{future::Future, time::Duration};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, U64},
};
use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::{StepKey, artifact::ArtifactStore, rpc};

/// Default time to wait for a deployment transaction to be mined.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// A single deployment action handed to a [`DeploymentBackend`].
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    /// Fully-qualified key of the step being deployed.
    pub key: &'a StepKey,
    /// Name of the compiled contract to instantiate.
    pub contract: &'a str,
    /// Constructor arguments, in ABI order.
    pub args: &'a [DynSolValue],
    /// Sender override for this step.
    pub from: Option<Address>,
}

impl DeployRequest<'_> {
    /// ABI-encoded constructor arguments, appended to the creation bytecode.
    pub fn encoded_args(&self) -> Vec<u8> {
        if self.args.is_empty() {
            return Vec::new();
        }
        DynSolValue::Tuple(self.args.to_vec()).abi_encode_params()
    }
}

/// The external deployment action.
///
/// Implementations report failures as errors; the deployer propagates them
/// unchanged and records nothing for the failed step.
pub trait DeploymentBackend {
    fn deploy(&mut self, request: DeployRequest<'_>) -> impl Future<Output = Result<Address>> + Send;
}

/// A deployment recorded by the [`SimulatedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDeployment {
    pub key: StepKey,
    pub contract: String,
    pub args: Vec<DynSolValue>,
    pub address: Address,
}

/// Backend that never touches a chain.
///
/// Addresses are the CREATE addresses a sender would get for consecutive
/// nonces, which makes dry runs print realistic, deterministic output.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    sender: Address,
    nonce: u64,
    deployments: Vec<SimulatedDeployment>,
}

impl SimulatedBackend {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            nonce: 0,
            deployments: Vec::new(),
        }
    }

    /// Every deployment performed so far, in order.
    pub fn deployments(&self) -> &[SimulatedDeployment] {
        &self.deployments
    }
}

impl DeploymentBackend for SimulatedBackend {
    async fn deploy(&mut self, request: DeployRequest<'_>) -> Result<Address> {
        let sender = request.from.unwrap_or(self.sender);
        let address = sender.create(self.nonce);
        self.nonce += 1;

        tracing::debug!(
            key = %request.key,
            contract = request.contract,
            %address,
            "Simulated deployment"
        );

        self.deployments.push(SimulatedDeployment {
            key: request.key.clone(),
            contract: request.contract.to_string(),
            args: request.args.to_vec(),
            address,
        });

        Ok(address)
    }
}

/// Receipt fields needed to confirm a contract creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    status: Option<U64>,
    contract_address: Option<Address>,
}

/// Backend submitting contract creations over JSON-RPC.
///
/// Transactions are sent with `eth_sendTransaction`, so the sender must be an
/// account unlocked on the node (e.g. a local Anvil account). Signing, gas
/// pricing and retries are left to the node.
#[derive(Debug, Clone)]
pub struct RpcBackend {
    client: reqwest::Client,
    url: Url,
    sender: Address,
    artifacts: ArtifactStore,
    receipt_timeout: Duration,
}

impl RpcBackend {
    pub fn new(url: Url, sender: Address, artifacts: ArtifactStore) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            url,
            sender,
            artifacts,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// Set how long to wait for a deployment transaction to be mined.
    pub fn receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let start = std::time::Instant::now();

        loop {
            if start.elapsed() > self.receipt_timeout {
                anyhow::bail!("Timeout waiting for deployment transaction {} to be mined", tx_hash);
            }

            let receipt: Option<TransactionReceipt> = rpc::call(
                &self.client,
                &self.url,
                "eth_getTransactionReceipt",
                vec![serde_json::json!(tx_hash)],
            )
            .await?;

            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            tracing::trace!(%tx_hash, "Deployment transaction not mined yet, retrying...");
            tokio::time::sleep(rpc::DEFAULT_POLL_INTERVAL).await;
        }
    }
}

impl DeploymentBackend for RpcBackend {
    async fn deploy(&mut self, request: DeployRequest<'_>) -> Result<Address> {
        let artifact = self.artifacts.load(request.contract).await?;

        let mut data = artifact.bytecode.to_vec();
        data.extend(request.encoded_args());

        let from = request.from.unwrap_or(self.sender);
        let tx = serde_json::json!({
            "from": from,
            "data": Bytes::from(data),
        });

        let tx_hash: B256 = rpc::call(
            &self.client,
            &self.url,
            "eth_sendTransaction",
            vec![tx],
        )
        .await
        .with_context(|| format!("Failed to submit deployment of {}", request.key))?;

        tracing::info!(key = %request.key, %tx_hash, "Deployment transaction submitted");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if receipt.status == Some(U64::ZERO) {
            anyhow::bail!("Deployment of {} reverted (tx {})", request.key, tx_hash);
        }

        receipt
            .contract_address
            .with_context(|| format!("Receipt for tx {} has no contract address", tx_hash))
    }
}
