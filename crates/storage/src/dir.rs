use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::{validate_draft_name, DraftStore};

const DRAFT_EXTENSION: &str = "json";

/// One `<name>.json` file per draft inside a single directory.
#[derive(Debug, Clone)]
pub struct DirDraftStore {
    root: PathBuf,
}

impl DirDraftStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.with_context(|| {
            format!("failed to create draft directory '{}'", root.display())
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{DRAFT_EXTENSION}"))
    }
}

#[async_trait]
impl DraftStore for DirDraftStore {
    async fn put(&self, name: &str, blob: &str) -> Result<bool> {
        validate_draft_name(name)?;
        let path = self.path_for(name);
        let replaced = fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to inspect '{}'", path.display()))?;

        // Write to a sibling first so a crash never leaves a truncated draft.
        let staging = self.root.join(format!(".{name}.{DRAFT_EXTENSION}.tmp"));
        fs::write(&staging, blob)
            .await
            .with_context(|| format!("failed to write '{}'", staging.display()))?;
        fs::rename(&staging, &path)
            .await
            .with_context(|| format!("failed to move draft into '{}'", path.display()))?;

        debug!(path = %path.display(), replaced, "draft written");
        Ok(replaced)
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        validate_draft_name(name)?;
        let path = self.path_for(name);
        match fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read draft '{}'", path.display()))
            }
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await.with_context(|| {
            format!("failed to list draft directory '{}'", self.root.display())
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            names.push(stem.to_string());
        }
        names.sort();
        Ok(names)
    }

    fn location(&self, name: &str) -> String {
        self.path_for(name).display().to_string()
    }
}
