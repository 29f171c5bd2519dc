//! Recipe declaration parsing and dataset discovery
//!
//! Datasets are plain text, one recipe per line:
//!
//! ```text
//! # name          units / cycle   requirements
//! Magnetic_Coil   2 / 1           Magnetic_Ring=2 Copper_Ingot=1
//! ```
//!
//! Declarations are registered in file order, so a requirement declared
//! further down only produces a warning.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

use crate::catalog::Catalog;
use crate::error::CalcError;

/// The Dyson Sphere Program dataset shipped with the crate.
pub const BUILTIN_DATASET: &str = include_str!("../data/dyson_sphere.recipes");

const BUILTIN_ORIGIN: &str = "<builtin>";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)(?:\s+(.*))?$")
        .expect("declaration pattern is valid")
});

static REQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^=\s]+)=(\d+(?:\.\d+)?)$").expect("requirement pattern is valid")
});

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line}: {reason}")]
    Parse {
        origin: String,
        line: usize,
        reason: String,
    },

    #[error("{origin}:{line}: {source}")]
    Recipe {
        origin: String,
        line: usize,
        #[source]
        source: CalcError,
    },

    #[error("no *.recipes files found under {}", .0.display())]
    NoDataset(PathBuf),
}

/// One parsed recipe line, before registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub units: f64,
    pub cycle_time: f64,
    pub requirements: Vec<(String, f64)>,
    pub line: usize,
}

/// Parse every declaration in `text`. `origin` names the source in errors.
pub fn parse_declarations(text: &str, origin: &str) -> Result<Vec<Declaration>, LoadError> {
    let mut declarations = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let parse_err = |reason: String| LoadError::Parse {
            origin: origin.to_string(),
            line,
            reason,
        };

        let cap = LINE_RE
            .captures(content)
            .ok_or_else(|| parse_err(format!("expected `<name> <units> / <cycle time> ...`, got `{content}`")))?;

        let units = parse_number(&cap[2]).map_err(&parse_err)?;
        let cycle_time = parse_number(&cap[3]).map_err(&parse_err)?;

        let mut requirements = Vec::new();
        if let Some(rest) = cap.get(4) {
            for token in rest.as_str().split_whitespace() {
                let req = REQ_RE
                    .captures(token)
                    .ok_or_else(|| parse_err(format!("expected `<name>=<quantity>`, got `{token}`")))?;
                requirements.push((req[1].to_string(), parse_number(&req[2]).map_err(&parse_err)?));
            }
        }

        declarations.push(Declaration {
            name: cap[1].to_string(),
            units,
            cycle_time,
            requirements,
            line,
        });
    }

    Ok(declarations)
}

fn parse_number(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .map_err(|e| format!("invalid number `{text}`: {e}"))
}

/// Find all `*.recipes` files below `dir`, in path order.
pub fn find_recipe_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "recipes"))
        .collect();
    files.sort();
    files
}

/// Register `declarations` in order.
pub fn load_into(
    catalog: &mut Catalog,
    declarations: &[Declaration],
    origin: &str,
) -> Result<LoadStats, LoadError> {
    let mut stats = LoadStats::default();

    for decl in declarations {
        let reqs = decl.requirements.iter().map(|(n, q)| (n.as_str(), *q));
        let registration = catalog
            .register(&decl.name, decl.units, decl.cycle_time, reqs)
            .map_err(|source| LoadError::Recipe {
                origin: origin.to_string(),
                line: decl.line,
                source,
            })?;

        stats.declarations += 1;
        if registration.inserted {
            stats.registered += 1;
        } else {
            stats.duplicates += 1;
        }
        stats.forward_refs += registration.missing.len();
    }

    Ok(stats)
}

/// Build a catalog from every `*.recipes` file below `dir`.
pub fn load_dir(dir: &Path) -> Result<(Catalog, LoadStats), LoadError> {
    let files = find_recipe_files(dir);
    if files.is_empty() {
        return Err(LoadError::NoDataset(dir.to_path_buf()));
    }

    let mut catalog = Catalog::new();
    let mut stats = LoadStats::default();

    for path in &files {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let origin = path.display().to_string();
        let declarations = parse_declarations(&text, &origin)?;
        let file_stats = load_into(&mut catalog, &declarations, &origin)?;
        tracing::info!(file = %origin, recipes = file_stats.declarations, "loaded recipe file");
        stats.merge(&file_stats);
        stats.files += 1;
    }

    Ok((catalog, stats))
}

/// Catalog holding the embedded Dyson Sphere Program dataset.
pub fn builtin_catalog() -> Result<Catalog, LoadError> {
    let declarations = parse_declarations(BUILTIN_DATASET, BUILTIN_ORIGIN)?;
    let mut catalog = Catalog::new();
    let stats = load_into(&mut catalog, &declarations, BUILTIN_ORIGIN)?;
    tracing::debug!(%stats, "loaded builtin dataset");
    Ok(catalog)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub files: usize,
    pub declarations: usize,
    pub registered: usize,
    pub duplicates: usize,
    pub forward_refs: usize,
}

impl LoadStats {
    fn merge(&mut self, other: &LoadStats) {
        self.files += other.files;
        self.declarations += other.declarations;
        self.registered += other.registered;
        self.duplicates += other.duplicates;
        self.forward_refs += other.forward_refs;
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} recipes from {} declarations ({} files). Duplicates: {}, forward references: {}",
            self.registered, self.declarations, self.files, self.duplicates, self.forward_refs
        )
    }
}
