//! Durable storage of named deployment snapshots.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::{File, OpenOptions},
    future::Future,
    io::Write,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use derive_more::{Deref, DerefMut, From};
use fs2::FileExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Conventional snapshot name used by the deployment pipelines.
pub const LATEST_SNAPSHOT: &str = "latest.json";

/// Lock file guarding concurrent writers inside a [`FileStore`] directory.
const LOCK_FILENAME: &str = ".snapshots.lock";

/// Persisted mapping from logical role (e.g. `openmeshGenesis`) to deployed address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref, DerefMut, From)]
pub struct DeploymentSnapshot(BTreeMap<String, Address>);

impl DeploymentSnapshot {
    /// Build a snapshot from a deployment result whose fields are all addresses.
    pub fn from_deployment<T: Serialize>(deployment: &T) -> Result<Self> {
        let value =
            serde_json::to_value(deployment).context("Failed to serialize deployment result")?;
        serde_json::from_value(value)
            .context("Deployment result is not a flat mapping from role to address")
    }

    /// Decode a deployment result from this snapshot.
    ///
    /// Fails if a role expected by `T` is missing from the snapshot.
    pub fn to_deployment<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(&self.0).context("Failed to serialize snapshot")?;
        serde_json::from_value(value).context("Snapshot does not match the expected deployment")
    }
}

impl fmt::Display for DeploymentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Role", "Address"]);
        for (role, address) in &self.0 {
            table.add_row(vec![role.clone(), address.to_checksum(None)]);
        }
        write!(f, "{table}")
    }
}

/// Named snapshot persistence.
///
/// `load` distinguishes a missing snapshot (`Ok(None)`) from a failure to read
/// or parse one (`Err`).
pub trait DeploymentStore {
    /// Write `snapshot` under `name`, replacing any previous snapshot of that name.
    fn save(
        &mut self,
        name: &str,
        snapshot: &DeploymentSnapshot,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read the snapshot stored under `name`, if any.
    fn load(&self, name: &str) -> impl Future<Output = Result<Option<DeploymentSnapshot>>> + Send;
}

/// In-process snapshot storage, used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: HashMap<String, DeploymentSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl DeploymentStore for MemoryStore {
    async fn save(&mut self, name: &str, snapshot: &DeploymentSnapshot) -> Result<()> {
        self.snapshots.insert(name.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<DeploymentSnapshot>> {
        Ok(self.snapshots.get(name).cloned())
    }
}

/// Snapshot storage backed by one JSON file per snapshot name inside a directory.
///
/// Writes are atomic: the content goes to a temporary sibling file which is
/// synced and then renamed over the target, so readers either see the previous
/// snapshot or the new one. Writers from different processes are serialized by
/// an exclusive lock on a lock file in the same directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the snapshot `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let is_plain_file_name = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && name != LOCK_FILENAME;
        if !is_plain_file_name {
            anyhow::bail!("Invalid snapshot name `{}`: expected a plain file name", name);
        }

        Ok(self.dir.join(name))
    }
}

impl DeploymentStore for FileStore {
    async fn save(&mut self, name: &str, snapshot: &DeploymentSnapshot) -> Result<()> {
        let path = self.path_for(name)?;
        let content =
            serde_json::to_vec_pretty(snapshot).context("Failed to serialize deployment snapshot")?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &content))
            .await
            .context("Snapshot writer task panicked")??;

        tracing::info!(path = %path.display(), roles = snapshot.len(), "Deployment snapshot saved");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<DeploymentSnapshot>> {
        let path = self.path_for(name)?;

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No deployment snapshot found");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to read deployment snapshot from {}",
                    path.display()
                ));
            }
        };

        let snapshot = serde_json::from_slice(&content).context(format!(
            "Failed to parse deployment snapshot {}",
            path.display()
        ))?;

        tracing::debug!(path = %path.display(), "Deployment snapshot loaded");
        Ok(Some(snapshot))
    }
}

fn write_atomic(dir: &Path, target: &Path, content: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .context(format!("Failed to create snapshot directory {}", dir.display()))?;

    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(LOCK_FILENAME))
        .context("Failed to open snapshot lock file")?;
    lock.lock_exclusive()
        .context("Failed to acquire snapshot lock")?;

    let file_name = target
        .file_name()
        .context("Snapshot path has no file name")?
        .to_string_lossy();
    let tmp = dir.join(format!(".{}.tmp", file_name));

    let result = (|| -> Result<()> {
        let mut file = File::create(&tmp)
            .context(format!("Failed to create temporary snapshot {}", tmp.display()))?;
        file.write_all(content)
            .context("Failed to write temporary snapshot")?;
        file.sync_all().context("Failed to sync temporary snapshot")?;
        std::fs::rename(&tmp, target)
            .context(format!("Failed to move snapshot into place at {}", target.display()))
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }

    FileExt::unlock(&lock).context("Failed to release snapshot lock")?;
    result
}
