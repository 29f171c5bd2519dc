//! Dyson Sphere Program production calculator
//!
//! Expands a recipe into the full tree of upstream items scaled to a target
//! rate, aggregates trees into per-item totals, and answers "what uses X"
//! queries over the recipe catalog.

pub mod calculator;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod models;
pub mod total;
pub mod usage;

pub use calculator::{ChainLines, combine, expand};
pub use catalog::{Catalog, Registration, normalize_name};
pub use error::CalcError;
pub use extract::{LoadError, LoadStats, builtin_catalog, load_dir};
pub use models::{ChainNode, Recipe, Requirement};
pub use total::{SortKey, Total, TotalEntry};
pub use usage::UsageIndex;
