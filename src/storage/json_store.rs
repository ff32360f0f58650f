use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::Ledger;

const TMP_SUFFIX: &str = "tmp";

/// Persists the whole ledger as a single JSON document.
///
/// Every call round-trips the full file. There is no locking: two processes
/// writing the same file at once can lose an update.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger, creating and persisting an empty one if the file does not exist.
    pub async fn load(&self) -> Result<Ledger> {
        let exists = fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to access {}", self.path.display()))?;

        if !exists {
            let ledger = Ledger::new();
            self.save(&ledger).await?;
            tracing::info!(path = %self.path.display(), "created new ledger");
            return Ok(ledger);
        }

        let data = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut ledger: Ledger = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        let issues = ledger.integrity_issues();
        if !issues.is_empty() {
            let details: Vec<String> = issues.iter().map(|issue| issue.to_string()).collect();
            bail!(
                "Ledger {} is inconsistent: {}",
                self.path.display(),
                details.join("; ")
            );
        }

        let repaired = ledger
            .recompute_totals()
            .with_context(|| format!("Ledger {} is inconsistent", self.path.display()))?;
        if repaired {
            tracing::warn!(
                path = %self.path.display(),
                count = ledger.count,
                total = ledger.total,
                "stored count/total did not match expenses; recomputed"
            );
        }

        tracing::debug!(
            path = %self.path.display(),
            count = ledger.count,
            next_id = ledger.next_id,
            "loaded ledger"
        );
        Ok(ledger)
    }

    /// Write the ledger by staging to a sibling temp file and renaming it over the target.
    /// On failure the previous document is left in place.
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(ledger).context("Failed to serialize ledger")?;
        let tmp = self.tmp_path();

        if let Err(err) = write_synced(&tmp, json.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err).with_context(|| format!("Failed to replace {}", self.path.display()));
        }

        tracing::debug!(
            path = %self.path.display(),
            count = ledger.count,
            "saved ledger"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(TMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}
