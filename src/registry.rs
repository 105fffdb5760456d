use crate::errors::{AppError, AppResult};
use crate::models::EntityIndex;
use base64::Engine;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const ELLIPSIS: &str = "...";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFile {
    roots: Vec<RootFileEntry>,
    max_bin: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RootFileEntry {
    label: String,
    sha256_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub label: String,
    pub fingerprint: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    roots: Vec<RootRecord>,
    bound: usize,
}

impl Registry {
    pub fn new(roots: Vec<RootRecord>) -> Self {
        let bound = roots.len();
        Self { roots, bound }
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Registry(format!("cannot read {}: {}", path.display(), err)))?;
        let registry = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), roots = registry.roots.len(), bound = registry.bound, "loaded CA registry");
        Ok(registry)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let file: RegistryFile =
            serde_json::from_str(raw).map_err(|err| AppError::Registry(err.to_string()))?;

        let mut roots = Vec::with_capacity(file.roots.len());
        for (index, entry) in file.roots.into_iter().enumerate() {
            if entry.label.trim().is_empty() {
                return Err(AppError::Registry(format!("root {} has an empty label", index)));
            }
            let fingerprint = base64::engine::general_purpose::STANDARD.decode(entry.sha256_fingerprint.trim())?;
            roots.push(RootRecord {
                label: entry.label,
                fingerprint,
            });
        }

        let bound = file.max_bin.unwrap_or(roots.len());
        if bound > roots.len() {
            return Err(AppError::Registry(format!(
                "maxBin {} exceeds the {} known roots",
                bound,
                roots.len()
            )));
        }

        Ok(Self { roots, bound })
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn get(&self, index: EntityIndex) -> Option<&RootRecord> {
        if index >= self.bound {
            return None;
        }
        self.roots.get(index)
    }
}

pub fn normalize_label(raw: &str) -> String {
    raw.replace('_', " ")
}

pub fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        return label.to_string();
    }
    let mut truncated = label.chars().take(max_len).collect::<String>();
    truncated.push_str(ELLIPSIS);
    truncated
}

pub fn format_fingerprint(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(":")
}
