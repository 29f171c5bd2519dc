//! Per-item totals of one or more production chains

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;

use crate::catalog::normalize_name;
use crate::error::{CalcError, Result};
use crate::models::ChainNode;

/// Summed throughput of every occurrence of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalEntry {
    pub name: String,
    pub rate: f64,
    pub factories: f64,
}

impl TotalEntry {
    fn absorb(&mut self, rate: f64, factories: f64) {
        self.rate += rate;
        self.factories += factories;
    }
}

impl fmt::Display for TotalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  x {:.2} : {:.2}/sec", self.name, self.factories, self.rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Rate,
    Factories,
}

/// Item name to merged throughput, at most one entry per item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Total {
    entries: BTreeMap<String, TotalEntry>,
}

impl Total {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate a chain, pruning every node deeper than `max_depth`.
    pub fn of(root: &ChainNode, max_depth: Option<usize>) -> Self {
        let mut total = Self::new();
        total.collect(root, max_depth, 0);
        tracing::debug!(root = %root.name(), ?max_depth, items = total.len(), "aggregated chain");
        total
    }

    fn collect(&mut self, node: &ChainNode, max_depth: Option<usize>, depth: usize) {
        if max_depth.is_some_and(|max| depth > max) {
            return;
        }

        self.add(node.name(), node.rate(), node.factories());
        for child in node.children() {
            self.collect(child, max_depth, depth + 1);
        }
    }

    fn add(&mut self, name: &str, rate: f64, factories: f64) {
        match self.entries.get_mut(name) {
            Some(entry) => entry.absorb(rate, factories),
            None => {
                self.entries.insert(
                    name.to_string(),
                    TotalEntry {
                        name: name.to_string(),
                        rate,
                        factories,
                    },
                );
            }
        }
    }

    /// Merge two totals: union of items, summed where both have one.
    pub fn sum_with(&self, other: &Total) -> Total {
        let mut merged = self.clone();
        for entry in other.entries.values() {
            merged.add(&entry.name, entry.rate, entry.factories);
        }
        merged
    }

    pub fn sum_all(totals: &[Total]) -> Total {
        totals.iter().sum()
    }

    /// Aggregate several chains, each to its own optional depth bound.
    pub fn sum_of(nodes: &[ChainNode], depths: Option<&[Option<usize>]>) -> Result<Total> {
        match depths {
            None => Ok(nodes.iter().map(|n| Total::of(n, None)).sum()),
            Some(depths) if depths.len() != nodes.len() => Err(CalcError::LengthMismatch {
                nodes: nodes.len(),
                depths: depths.len(),
            }),
            Some(depths) => Ok(nodes
                .iter()
                .zip(depths)
                .map(|(n, d)| Total::of(n, *d))
                .sum()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TotalEntry> {
        normalize_name(name).and_then(|key| self.entries.get(&key))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TotalEntry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by `key`. The sort is stable; equal keys keep name order.
    pub fn sorted(&self, key: SortKey, descending: bool) -> Vec<&TotalEntry> {
        let mut entries: Vec<&TotalEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            let ord = compare(a, b, key);
            if descending { ord.reverse() } else { ord }
        });
        entries
    }
}

fn compare(a: &TotalEntry, b: &TotalEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Rate => a.rate.total_cmp(&b.rate),
        SortKey::Factories => a.factories.total_cmp(&b.factories),
    }
}

impl<'a> Sum<&'a Total> for Total {
    fn sum<I: Iterator<Item = &'a Total>>(iter: I) -> Self {
        iter.fold(Total::new(), |acc, t| acc.sum_with(t))
    }
}

impl Sum<Total> for Total {
    fn sum<I: Iterator<Item = Total>>(iter: I) -> Self {
        iter.fold(Total::new(), |acc, t| acc.sum_with(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::expand;
    use crate::catalog::Catalog;
    use approx::assert_relative_eq;

    const NONE: [(&str, f64); 0] = [];

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register("Copper_Ore", 1.0, 1.0, NONE).unwrap();
        catalog
            .register("Copper_Ingot", 1.0, 1.0, [("Copper_Ore", 1.0)])
            .unwrap();
        catalog.register("Iron_Ore", 1.0, 1.0, NONE).unwrap();
        catalog
            .register("Iron_Ingot", 1.0, 1.0, [("Iron_Ore", 1.0)])
            .unwrap();
        catalog
            .register("Magnetic_Ring", 1.0, 1.5, [("Iron_Ore", 1.0)])
            .unwrap();
        catalog
            .register(
                "Magnetic_Coil",
                2.0,
                1.0,
                [("Magnetic_Ring", 2.0), ("Copper_Ingot", 1.0)],
            )
            .unwrap();
        catalog
            .register(
                "Tesla_Tower",
                1.0,
                1.0,
                [("Iron_Ingot", 2.0), ("Magnetic_Coil", 1.0)],
            )
            .unwrap();
        catalog
    }

    fn entry(total: &Total, name: &str) -> (f64, f64) {
        let e = total.get(name).unwrap_or_else(|| panic!("{name} missing"));
        (e.rate, e.factories)
    }

    #[test]
    fn magnetic_coil_total() {
        let catalog = catalog();
        let coil = expand(&catalog, "Magnetic_Coil", Some(2.0)).unwrap();
        let total = Total::of(&coil, None);

        let names: Vec<&str> = total.names().collect();
        assert_eq!(
            names,
            vec!["Copper_Ingot", "Copper_Ore", "Iron_Ore", "Magnetic_Coil", "Magnetic_Ring"]
        );
        let (rate, factories) = entry(&total, "iron ore");
        assert_relative_eq!(rate, 2.0, epsilon = 1e-9);
        assert_relative_eq!(factories, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn repeated_items_are_summed() {
        let catalog = catalog();
        let tower = expand(&catalog, "Tesla_Tower", None).unwrap();
        let total = Total::of(&tower, None);

        // Iron_Ore comes from Iron_Ingot (2/sec) and from Magnetic_Ring (1/sec).
        let (rate, factories) = entry(&total, "Iron_Ore");
        assert_relative_eq!(rate, 3.0, epsilon = 1e-9);
        assert_relative_eq!(factories, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn depth_bound_prunes_subtrees() {
        let catalog = catalog();
        let tower = expand(&catalog, "Tesla_Tower", None).unwrap();

        let root_only = Total::of(&tower, Some(0));
        assert_eq!(root_only.len(), 1);
        assert!(root_only.contains("Tesla_Tower"));

        let first = Total::of(&tower, Some(1));
        let names: Vec<&str> = first.names().collect();
        assert_eq!(names, vec!["Iron_Ingot", "Magnetic_Coil", "Tesla_Tower"]);
    }

    #[test]
    fn sum_with_unions_keys() {
        let catalog = catalog();
        let coil = Total::of(&expand(&catalog, "Magnetic_Coil", None).unwrap(), None);
        let ingot = Total::of(&expand(&catalog, "Iron_Ingot", Some(4.0)).unwrap(), None);

        let merged = coil.sum_with(&ingot);
        assert_eq!(merged.len(), 6);
        assert_relative_eq!(entry(&merged, "Iron_Ore").0, 6.0, epsilon = 1e-9);
        assert_relative_eq!(entry(&merged, "Copper_Ore").0, 1.0);
        assert_eq!(merged, ingot.sum_with(&coil));
    }

    #[test]
    fn sum_of_applies_each_depth() {
        let catalog = catalog();
        let nodes = vec![
            expand(&catalog, "Magnetic_Coil", None).unwrap(),
            expand(&catalog, "Iron_Ingot", None).unwrap(),
        ];

        let shallow = Total::sum_of(&nodes, Some([Some(0), None].as_slice())).unwrap();
        let names: Vec<&str> = shallow.names().collect();
        assert_eq!(names, vec!["Iron_Ingot", "Iron_Ore", "Magnetic_Coil"]);

        let full = Total::sum_of(&nodes, None).unwrap();
        assert_eq!(full, Total::sum_all(&[Total::of(&nodes[0], None), Total::of(&nodes[1], None)]));
    }

    #[test]
    fn sum_of_checks_lengths() {
        let catalog = catalog();
        let nodes = vec![expand(&catalog, "Iron_Ore", None).unwrap()];

        assert_eq!(
            Total::sum_of(&nodes, Some([None, Some(1)].as_slice())),
            Err(CalcError::LengthMismatch { nodes: 1, depths: 2 })
        );
    }

    #[test]
    fn sorted_orders_entries() {
        let catalog = catalog();
        let coil = expand(&catalog, "Magnetic_Coil", Some(2.0)).unwrap();
        let total = Total::of(&coil, None);

        let by_name: Vec<&str> = total
            .sorted(SortKey::Name, true)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(
            by_name,
            vec!["Magnetic_Ring", "Magnetic_Coil", "Iron_Ore", "Copper_Ore", "Copper_Ingot"]
        );

        let by_factories: Vec<&str> = total
            .sorted(SortKey::Factories, false)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(by_factories.last(), Some(&"Magnetic_Ring"));
        // Ties keep name order.
        assert_eq!(&by_factories[..3], &["Copper_Ingot", "Copper_Ore", "Magnetic_Coil"]);

        let by_rate = total.sorted(SortKey::Rate, false);
        assert_eq!(by_rate[0].name, "Copper_Ingot");
        assert!(by_rate.windows(2).all(|w| w[0].rate <= w[1].rate));
    }

    #[test]
    fn entry_display() {
        let entry = TotalEntry {
            name: "Iron_Ore".to_string(),
            rate: 2.0,
            factories: 2.0,
        };
        assert_eq!(entry.to_string(), "Iron_Ore  x 2.00 : 2.00/sec");
    }
}
