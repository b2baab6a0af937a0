//! Compiled contract artifacts in the Foundry `out/` layout.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Creation bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
struct FoundryArtifact {
    bytecode: BytecodeObject,
}

#[derive(Debug, Deserialize)]
struct BytecodeObject {
    object: Bytes,
}

/// Reads artifacts from `<out>/<Contract>.sol/<Contract>.json`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    out_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, contract: &str) -> PathBuf {
        self.out_dir
            .join(format!("{contract}.sol"))
            .join(format!("{contract}.json"))
    }

    pub async fn load(&self, contract: &str) -> Result<ContractArtifact> {
        let path = self.path_for(contract);

        let content = tokio::fs::read_to_string(&path).await.context(format!(
            "Failed to read artifact for {} from {}",
            contract,
            path.display()
        ))?;

        // Unlinked library placeholders (`__$...$__`) fail to parse as hex here.
        let artifact: FoundryArtifact = serde_json::from_str(&content).context(format!(
            "Failed to parse artifact {}. Is the bytecode fully linked?",
            path.display()
        ))?;

        if artifact.bytecode.object.is_empty() {
            anyhow::bail!(
                "Artifact for {} has no creation bytecode (abstract contract or interface?)",
                contract
            );
        }

        Ok(ContractArtifact {
            name: contract.to_string(),
            bytecode: artifact.bytecode.object,
        })
    }
}
