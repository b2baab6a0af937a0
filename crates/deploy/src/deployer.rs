//! The deployment orchestrator.
//!
//! A [`Deployer`] owns one run: the backend performing deployments, the snapshot
//! store, the context stack and the memo table of completed steps. Every
//! operation takes `&mut self`, so a run is driven by a single logical thread and
//! the memo table needs no locking.

use std::{collections::HashMap, fmt, sync::Arc};

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    backend::{DeployRequest, DeploymentBackend},
    context::{ContextGuard, ContextStack},
    settings::StepOptions,
    store::{DeploymentSnapshot, DeploymentStore},
};

/// Fully-qualified identifier of a deployment step: the context path at the
/// time of deployment plus the step id.
///
/// Kept structured rather than flattened so that context and id segments
/// containing `/` can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey {
    pub context: Vec<String>,
    pub id: String,
}

impl StepKey {
    pub fn new(context: Vec<String>, id: impl Into<String>) -> Self {
        Self {
            context,
            id: id.into(),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.context {
            write!(f, "{segment}/")?;
        }
        write!(f, "{}", self.id)
    }
}

/// Description of one contract deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployStep {
    /// Unique id within the context the step is deployed in.
    pub id: String,
    /// Name of the compiled contract to instantiate.
    pub contract: String,
    /// Constructor arguments, in ABI order.
    pub args: Vec<DynSolValue>,
    /// Sender override.
    pub from: Option<Address>,
}

impl DeployStep {
    pub fn new(id: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            contract: contract.into(),
            args: Vec::new(),
            from: None,
        }
    }

    pub fn args(mut self, args: Vec<DynSolValue>) -> Self {
        self.args = args;
        self
    }

    pub fn from(mut self, from: Option<Address>) -> Self {
        self.from = from;
        self
    }

    /// Build a step for `contract` from merged step options.
    ///
    /// Fails when the options carry no id.
    pub fn with_options(contract: impl Into<String>, options: StepOptions) -> Result<Self> {
        let id = crate::settings::required(options.id, "id")?;
        Ok(Self::new(id, contract).from(options.from))
    }
}

/// Result of a successful deployment. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedArtifact {
    pub address: Address,
    /// Key the artifact is memoized under.
    pub key: StepKey,
    /// The step that produced it.
    pub step: Arc<DeployStep>,
}

/// Deployment orchestrator for a single run.
pub struct Deployer<B, S> {
    backend: B,
    store: S,
    pub(crate) contexts: ContextStack,
    memo: HashMap<StepKey, DeployedArtifact>,
}

impl<B, S> Deployer<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            contexts: ContextStack::new(),
            memo: HashMap::new(),
        }
    }

    /// Enter a named context for the lifetime of the returned guard.
    pub fn context(&mut self, name: impl Into<String>) -> ContextGuard<'_, B, S> {
        ContextGuard::new(self, name.into())
    }

    /// The active context names, outermost first.
    pub fn context_path(&self) -> &[String] {
        self.contexts.path()
    }

    /// Key a step with the given id would be memoized under right now.
    pub fn key_for(&self, id: &str) -> StepKey {
        StepKey::new(self.contexts.path().to_vec(), id)
    }

    /// The artifact memoized under `key` during this run, if any.
    pub fn artifact(&self, key: &StepKey) -> Option<&DeployedArtifact> {
        self.memo.get(key)
    }

    /// All artifacts deployed during this run, ordered by key.
    pub fn artifacts(&self) -> Vec<&DeployedArtifact> {
        let mut artifacts: Vec<_> = self.memo.values().collect();
        artifacts.sort_by(|a, b| a.key.cmp(&b.key));
        artifacts
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (B, S) {
        (self.backend, self.store)
    }
}

impl<B, S> Deployer<B, S>
where
    B: DeploymentBackend,
    S: DeploymentStore,
{
    /// Deploy `step` under the current context, at most once per run.
    ///
    /// A step whose key was already deployed in this run returns the recorded
    /// artifact without calling the backend. Backend failures are returned
    /// unchanged and leave nothing recorded, so a later request retries.
    pub async fn deploy(&mut self, step: DeployStep) -> Result<DeployedArtifact> {
        let key = self.key_for(&step.id);

        if let Some(artifact) = self.memo.get(&key) {
            tracing::debug!(%key, address = %artifact.address, "Step already deployed in this run");
            return Ok(artifact.clone());
        }

        tracing::info!(%key, contract = %step.contract, args = step.args.len(), "Deploying contract...");

        let address = self
            .backend
            .deploy(DeployRequest {
                key: &key,
                contract: &step.contract,
                args: &step.args,
                from: step.from,
            })
            .await?;

        tracing::info!(%key, %address, "Contract deployed");

        let artifact = DeployedArtifact {
            address,
            key: key.clone(),
            step: Arc::new(step),
        };
        self.memo.insert(key, artifact.clone());

        Ok(artifact)
    }

    /// Run `f` inside the named context. The context is left before returning,
    /// whether `f` succeeds or fails.
    pub async fn in_context<T, F>(&mut self, name: impl Into<String>, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        let mut scope = self.context(name);
        f(&mut *scope).await
    }

    /// Reuse a stored deployment or build and persist a fresh one.
    ///
    /// - `Some(false)`: reuse the snapshot named `name` when it exists, without
    ///   invoking `builder`; build and persist otherwise.
    /// - `Some(true)`: always build, then persist.
    /// - `None`: always build, then persist. Omitting the flag does not opt
    ///   into reuse.
    pub async fn load_or_deploy<T, F>(
        &mut self,
        name: &str,
        redeploy: Option<bool>,
        builder: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        if redeploy == Some(false) {
            if let Some(snapshot) = self.store.load(name).await? {
                tracing::info!(snapshot = name, "Reusing stored deployment, skipping deployment");
                return snapshot
                    .to_deployment()
                    .with_context(|| format!("Stored deployment `{}` cannot be reused", name));
            }
            tracing::info!(snapshot = name, "No stored deployment found, deploying");
        }

        let deployment = builder(self).await?;

        let snapshot = DeploymentSnapshot::from_deployment(&deployment)?;
        self.store
            .save(name, &snapshot)
            .await
            .with_context(|| format!("Failed to persist deployment `{}`", name))?;

        Ok(deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::SimulatedBackend, store::MemoryStore};

    fn deployer() -> Deployer<SimulatedBackend, MemoryStore> {
        Deployer::new(
            SimulatedBackend::new(Address::repeat_byte(0x42)),
            MemoryStore::new(),
        )
    }

    #[test]
    fn test_step_key_display() {
        let key = StepKey::new(vec!["lib/open-token".to_string()], "OpenToken");
        assert_eq!(key.to_string(), "lib/open-token/OpenToken");
        assert_eq!(StepKey::new(Vec::new(), "Root").to_string(), "Root");
    }

    #[test]
    fn test_step_keys_do_not_collide_across_segments() {
        let a = StepKey::new(vec!["a/b".to_string()], "c");
        let b = StepKey::new(vec!["a".to_string()], "b/c");
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_same_key_deploys_once() {
        let mut deployer = deployer();

        let first = deployer
            .deploy(DeployStep::new("OpenToken", "OpenToken"))
            .await
            .unwrap();
        let second = deployer
            .deploy(DeployStep::new("OpenToken", "OpenToken"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(deployer.backend().deployments().len(), 1);
    }

    #[tokio::test]
    async fn test_contexts_distinguish_identical_steps() {
        let mut deployer = deployer();

        let outer = deployer
            .deploy(DeployStep::new("OpenToken", "OpenToken"))
            .await
            .unwrap();
        let scoped = {
            let mut scope = deployer.context("second");
            scope
                .deploy(DeployStep::new("OpenToken", "OpenToken"))
                .await
                .unwrap()
        };

        assert_ne!(outer.address, scoped.address);
        assert_eq!(scoped.key.to_string(), "second/OpenToken");
        assert!(deployer.context_path().is_empty());
        assert_eq!(deployer.artifacts().len(), 2);
    }

    #[test]
    fn test_step_with_options_requires_id() {
        assert!(DeployStep::with_options("OpenToken", StepOptions::default()).is_err());

        let step = DeployStep::with_options("OpenToken", StepOptions::named("Token")).unwrap();
        assert_eq!(step.id, "Token");
        assert_eq!(step.contract, "OpenToken");
    }
}
