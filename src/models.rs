//! Data models for recipes and scaled production chains

use std::fmt;
use std::sync::Arc;

/// A single input of a recipe, already normalized to units per second
/// of one unscaled factory.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub item: String,
    pub rate_per_s: f64,
}

/// Static definition of how one item is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub units_per_cycle: f64,
    pub cycle_time_s: f64,
    pub output_rate: f64, // units / cycle_time
    pub requirements: Vec<Requirement>,
}

impl Recipe {
    /// Number of factories needed to reach `rate`.
    pub fn factories_for(&self, rate: f64) -> f64 {
        rate / self.output_rate
    }

    /// Whether `item` (already normalized) is a direct input of this recipe.
    pub fn requires(&self, item: &str) -> bool {
        self.requirements.iter().any(|r| r.item == item)
    }

    /// Requirement rates multiplied by `factories`, in declaration order.
    pub fn scaled_requirements(&self, factories: f64) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.requirements
            .iter()
            .map(move |r| (r.item.as_str(), r.rate_per_s * factories))
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "< {} @{:.2}/sec", self.name, self.output_rate)?;
        if !self.requirements.is_empty() {
            let reqs: Vec<String> = self
                .requirements
                .iter()
                .map(|r| format!("{} : {:.2}/sec", r.item, r.rate_per_s))
                .collect();
            write!(f, " requires {}", reqs.join(", "))?;
        }
        write!(f, " >")
    }
}

/// One item of a production chain, scaled to a target rate.
///
/// A node owns its children; the tree is rebuilt, never patched, when the
/// target changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    pub(crate) recipe: Arc<Recipe>,
    pub(crate) rate: f64,
    pub(crate) factories: f64,
    pub(crate) children: Vec<ChainNode>,
}

impl ChainNode {
    pub fn name(&self) -> &str {
        &self.recipe.name
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Achieved output rate in units per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Factories needed, relative to one unscaled recipe.
    pub fn factories(&self) -> f64 {
        self.factories
    }

    pub fn children(&self) -> &[ChainNode] {
        &self.children
    }

    /// Length of the longest path from this node down to a leaf.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order iterator over this node and every descendant, with depths.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ChainNode)> + '_ {
        let mut stack = vec![(0usize, self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            Some((depth, node))
        })
    }
}

impl fmt::Display for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "< {} @ {:.2}/sec (x{:.2}) >",
            self.recipe.name, self.rate, self.factories
        )
    }
}
