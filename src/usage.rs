//! Reverse-dependency queries: which items use a given item

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::calculator::expand;
use crate::catalog::{Catalog, normalize_name};
use crate::error::Result;
use crate::total::Total;

/// Answers "what needs item X" over an immutable catalog.
///
/// Direct queries only read requirement lists. The first indirect query
/// expands every catalog item once at its default rate and keeps the set of
/// item names found in each chain.
#[derive(Debug)]
pub struct UsageIndex<'c> {
    catalog: &'c Catalog,
    upstream: OnceCell<BTreeMap<String, BTreeSet<String>>>,
}

impl<'c> UsageIndex<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            upstream: OnceCell::new(),
        }
    }

    fn upstream(&self) -> Result<&BTreeMap<String, BTreeSet<String>>> {
        if let Some(upstream) = self.upstream.get() {
            return Ok(upstream);
        }

        let mut upstream = BTreeMap::new();
        for name in self.catalog.names() {
            let chain = expand(self.catalog, &name, None)?;
            let items: BTreeSet<String> = Total::of(&chain, None)
                .names()
                .filter(|n| *n != name)
                .map(str::to_string)
                .collect();
            upstream.insert(name, items);
        }
        tracing::debug!(items = upstream.len(), "built usage index");
        Ok(self.upstream.get_or_init(|| upstream))
    }

    /// Items whose own recipe lists `item` as an input.
    pub fn direct_users(&self, item: &str) -> BTreeSet<String> {
        let Some(key) = normalize_name(item) else {
            return BTreeSet::new();
        };
        self.catalog
            .recipes()
            .filter(|r| r.requires(&key))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Items that need `item` anywhere in their production chain.
    ///
    /// The item itself is never listed as its own user. Fails if any catalog
    /// item cannot be expanded.
    pub fn indirect_users(&self, item: &str) -> Result<BTreeSet<String>> {
        let Some(key) = normalize_name(item) else {
            return Ok(BTreeSet::new());
        };
        Ok(self
            .upstream()?
            .iter()
            .filter(|(_, items)| items.contains(&key))
            .map(|(name, _)| name.clone())
            .collect())
    }

    pub fn all_items(&self) -> BTreeSet<String> {
        self.catalog.names()
    }

    /// Everything that can be built without `item` anywhere in its chain.
    pub fn producible_without(&self, item: &str) -> Result<BTreeSet<String>> {
        let users = self.indirect_users(item)?;
        Ok(self.all_items().difference(&users).cloned().collect())
    }
}
