//! npm package discovery and component module resolution.
//!
//! A process's `component` string names a module relative to either the
//! graph document or the enclosing package. This module finds the package
//! root and turns a component reference into a `<component>.node.js` path.

use crate::config::ResolveConfig;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NpmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("package.json not found")]
    PackageJsonNotFound,
}

/// The nearest directory holding a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    pub path: Utf8PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
}

impl PackageRoot {
    /// Walk up from `start` to the first directory containing `manifest`.
    pub fn discover_from(start: &Utf8Path, manifest: &str) -> Option<Self> {
        let mut dir = start.to_path_buf();

        loop {
            let candidate = dir.join(manifest);
            if candidate.is_file() {
                return Some(Self::load(&dir, &candidate));
            }

            if !dir.pop() {
                return None;
            }
        }
    }

    fn load(root: &Utf8Path, manifest: &Utf8Path) -> Self {
        // A broken manifest still marks the root; only metadata is lost.
        let (name, version) = match read_manifest(manifest) {
            Ok(pkg) => (pkg.name, pkg.version),
            Err(e) => {
                tracing::warn!("could not read {}: {}", manifest, e);
                (None, None)
            }
        };

        Self {
            path: root.to_owned(),
            name,
            version,
        }
    }
}

fn read_manifest(path: &Utf8Path) -> Result<PackageJson, NpmError> {
    if !path.exists() {
        return Err(NpmError::PackageJsonNotFound);
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Outcome of resolving a component reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Utf8PathBuf),
    /// Nothing exists on disk; `candidates` lists every path tried, in order.
    Unresolved { candidates: Vec<Utf8PathBuf> },
}

impl Resolution {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolved { .. } => None,
        }
    }

    /// The resolved path, or the first path that was tried.
    pub fn display_path(&self) -> Option<&Utf8Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolved { candidates } => candidates.first().map(Utf8PathBuf::as_path),
        }
    }
}

/// Maps component references to module files on disk.
#[derive(Debug, Clone, Default)]
pub struct ComponentResolver {
    config: ResolveConfig,
}

impl ComponentResolver {
    pub fn new(config: ResolveConfig) -> Self {
        Self { config }
    }

    /// Resolve `component` as referenced from the document at `document`.
    ///
    /// Relative references (`./`, `../`) resolve against the document's
    /// directory only. Bare references resolve against the nearest package
    /// root, first directly and then under its modules directory. A relative
    /// document path is taken from the working directory; candidates are
    /// always absolute.
    pub fn resolve(&self, component: &str, document: &Utf8Path) -> Resolution {
        let document_dir = &absolute_dir(document);
        let file_name = format!("{}{}", component, self.config.suffix);

        let candidates = if is_relative_specifier(component) {
            vec![normalize(&document_dir.join(&file_name))]
        } else {
            match PackageRoot::discover_from(document_dir, &self.config.manifest) {
                Some(root) => vec![
                    normalize(&root.path.join(&file_name)),
                    normalize(&root.path.join(&self.config.modules_dir).join(&file_name)),
                ],
                None => {
                    tracing::debug!(
                        "no {} above {}; cannot resolve `{}`",
                        self.config.manifest,
                        document_dir,
                        component
                    );
                    Vec::new()
                }
            }
        };

        for candidate in &candidates {
            tracing::debug!("trying {}", candidate);
            if candidate.is_file() {
                return Resolution::Resolved(candidate.clone());
            }
        }

        Resolution::Unresolved { candidates }
    }
}

/// Absolute directory of `document`, lexically normalized.
fn absolute_dir(document: &Utf8Path) -> Utf8PathBuf {
    let dir = document
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    match std::path::absolute(dir).map(Utf8PathBuf::try_from) {
        Ok(Ok(abs)) => normalize(&abs),
        _ => {
            tracing::warn!("could not make {} absolute", dir);
            normalize(dir)
        }
    }
}

fn is_relative_specifier(component: &str) -> bool {
    component.starts_with("./") || component.starts_with("../")
}

/// Lexically remove `.` and `..` components.
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Utf8Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
