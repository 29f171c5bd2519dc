//! Production chain calculator logic

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{CalcError, Result};
use crate::models::{ChainNode, Recipe};

/// Calculate the production chain for `item` at `target_rate` units/sec.
///
/// Without a target the recipe's own output rate is used, i.e. one factory.
/// Returns a tree holding the item and every upstream input, each scaled
/// to what its parent consumes.
pub fn expand(catalog: &Catalog, item: &str, target_rate: Option<f64>) -> Result<ChainNode> {
    let recipe = catalog.get_shared(item)?;
    let node = expand_recipe(catalog, recipe, target_rate.unwrap_or(recipe.output_rate))?;
    tracing::debug!(item = %node.name(), rate = node.rate, nodes = node.iter().count(), "expanded chain");
    Ok(node)
}

fn expand_recipe(catalog: &Catalog, recipe: &Arc<Recipe>, rate: f64) -> Result<ChainNode> {
    if recipe.output_rate == 0.0 || !rate.is_finite() || rate < 0.0 {
        return Err(CalcError::InvalidTarget {
            name: recipe.name.clone(),
            rate,
        });
    }

    let factories = recipe.factories_for(rate);

    // No depth guard: the catalog is assumed acyclic.
    let mut children = Vec::with_capacity(recipe.requirements.len());
    for (item, required_rate) in recipe.scaled_requirements(factories) {
        let upstream = catalog.get_shared(item)?;
        children.push(expand_recipe(catalog, upstream, required_rate)?);
    }

    Ok(ChainNode {
        recipe: Arc::clone(recipe),
        rate,
        factories,
        children,
    })
}

/// Combine two chains of the same item into one sized for both rates.
///
/// The result is a fresh expansion, not a structural merge.
pub fn combine(catalog: &Catalog, a: &ChainNode, b: &ChainNode) -> Result<ChainNode> {
    if a.name() != b.name() {
        return Err(CalcError::NameMismatch {
            left: a.name().to_string(),
            right: b.name().to_string(),
        });
    }
    expand_recipe(catalog, &a.recipe, a.rate + b.rate)
}

impl ChainNode {
    /// Rebuild this chain for a new target, or for one factory when `None`.
    pub fn rescale(&self, catalog: &Catalog, target_rate: Option<f64>) -> Result<ChainNode> {
        expand(catalog, self.name(), target_rate)
    }

    /// Lazily render the chain as indented lines, depth-first.
    ///
    /// Nodes deeper than `max_depth` are skipped (the root is depth 0). In
    /// summarized mode every visited node is followed by a `---summary---`
    /// banner, a one-line digest of each child and a `---details---` banner
    /// before the children are shown in full. Leaves get an empty summary.
    pub fn lines(&self, max_depth: Option<usize>, summarized: bool) -> ChainLines<'_> {
        ChainLines {
            stack: vec![Step::Node(self, 0)],
            max_depth,
            summarized,
        }
    }
}

const INDENT: &str = "    ";

enum Step<'a> {
    Node(&'a ChainNode, usize),
    Digest(&'a ChainNode, usize),
    Banner(&'static str, usize),
}

/// Iterator returned by [`ChainNode::lines`].
pub struct ChainLines<'a> {
    stack: Vec<Step<'a>>,
    max_depth: Option<usize>,
    summarized: bool,
}

impl ChainLines<'_> {
    fn within(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}

impl<'a> Iterator for ChainLines<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match self.stack.pop()? {
                Step::Banner(text, depth) => return Some(format!("{}{}", INDENT.repeat(depth), text)),
                Step::Digest(node, depth) => return Some(format!("{}{}", INDENT.repeat(depth), node)),
                Step::Node(node, depth) => {
                    if !self.within(depth) {
                        continue;
                    }

                    let children = node.children.iter().rev().map(|c| Step::Node(c, depth + 1));
                    self.stack.extend(children);

                    if self.summarized {
                        self.stack.push(Step::Banner("---details---", depth + 1));
                        let digests = node.children.iter().rev().map(|c| Step::Digest(c, depth + 1));
                        self.stack.extend(digests);
                        self.stack.push(Step::Banner("---summary---", depth + 1));
                    }

                    return Some(format!("{}{}", INDENT.repeat(depth), node));
                }
            }
        }
    }
}
