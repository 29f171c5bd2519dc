//! In-memory recipe catalog
//!
//! Recipes are registered once while the dataset is loaded and only read
//! afterwards. Every name that enters or queries the catalog goes through
//! [`normalize_name`], so `"magnetic coil"` and `"Magnetic_Coil"` are the
//! same item.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::{CalcError, Result};
use crate::models::{Recipe, Requirement};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("word pattern is valid"));

/// Canonical form of an item name: alphanumeric runs, title-cased, joined by `_`.
///
/// Returns `None` when the input holds no alphanumeric character at all.
pub fn normalize_name(raw: &str) -> Option<String> {
    let words: Vec<String> = WORD_RE
        .find_iter(raw)
        .map(|m| title_case(m.as_str()))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Outcome of a single [`Catalog::register`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    /// False when the name was already registered; the first recipe wins.
    pub inserted: bool,
    /// Requirements that were not in the catalog at registration time.
    pub missing: Vec<String>,
}

/// All registered recipes, keyed by normalized item name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    recipes: BTreeMap<String, Arc<Recipe>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe producing `units` every `cycle_time` seconds.
    ///
    /// Requirement quantities are per cycle; they are stored as rates.
    /// Requirements that are not registered yet only produce a warning:
    /// they may be declared later in the same dataset.
    pub fn register<I, S>(
        &mut self,
        name: &str,
        units: f64,
        cycle_time: f64,
        requirements: I,
    ) -> Result<Registration>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let name = normalize_name(name).ok_or_else(|| CalcError::InvalidRecipe {
            name: name.to_string(),
            reason: "name has no alphanumeric characters".to_string(),
        })?;

        if !(cycle_time.is_finite() && cycle_time > 0.0) {
            return Err(invalid(&name, format!("cycle time {cycle_time} is not positive")));
        }
        if !(units.is_finite() && units >= 0.0) {
            return Err(invalid(&name, format!("output of {units} units per cycle")));
        }

        let mut reqs: Vec<Requirement> = Vec::new();
        for (req_name, quantity) in requirements {
            let raw = req_name.as_ref();
            let item = normalize_name(raw).ok_or_else(|| {
                invalid(&name, format!("requirement '{raw}' has no alphanumeric characters"))
            })?;
            if !(quantity.is_finite() && quantity >= 0.0) {
                return Err(invalid(&name, format!("requires {quantity} of '{item}'")));
            }

            let rate_per_s = quantity / cycle_time;
            match reqs.iter_mut().find(|r| r.item == item) {
                Some(existing) => existing.rate_per_s = rate_per_s,
                None => reqs.push(Requirement { item, rate_per_s }),
            }
        }

        let missing: Vec<String> = reqs
            .iter()
            .filter(|r| !self.recipes.contains_key(&r.item))
            .map(|r| r.item.clone())
            .collect();
        for item in &missing {
            tracing::warn!(recipe = %name, requirement = %item, "requirement not in catalog");
        }

        let inserted = !self.recipes.contains_key(&name);
        if inserted {
            let recipe = Recipe {
                name: name.clone(),
                units_per_cycle: units,
                cycle_time_s: cycle_time,
                output_rate: units / cycle_time,
                requirements: reqs,
            };
            tracing::debug!(recipe = %recipe, "registered");
            self.recipes.insert(name.clone(), Arc::new(recipe));
        } else {
            tracing::debug!(recipe = %name, "already registered, keeping first declaration");
        }

        Ok(Registration {
            name,
            inserted,
            missing,
        })
    }

    /// Look up a recipe by (unnormalized) name.
    pub fn lookup(&self, name: &str) -> Result<&Recipe> {
        self.get_shared(name).map(|r| r.as_ref())
    }

    pub(crate) fn get_shared(&self, name: &str) -> Result<&Arc<Recipe>> {
        normalize_name(name)
            .and_then(|key| self.recipes.get(&key))
            .ok_or_else(|| CalcError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        normalize_name(name).is_some_and(|key| self.recipes.contains_key(&key))
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.recipes.keys().cloned().collect()
    }

    /// Recipes in name order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> + '_ {
        self.recipes.values().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn invalid(name: &str, reason: String) -> CalcError {
    CalcError::InvalidRecipe {
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const NONE: [(&str, f64); 0] = [];

    #[rstest]
    #[case("Magnetic_Coil", "Magnetic_Coil")]
    #[case("magnetic coil", "Magnetic_Coil")]
    #[case("MAGNETIC-COIL", "Magnetic_Coil")]
    #[case("  copper__ingot!", "Copper_Ingot")]
    #[case("Conveyor_Belt_MKI", "Conveyor_Belt_Mki")]
    #[case("sorter mk2", "Sorter_Mk2")]
    #[case("über gear", "Über_Gear")]
    #[case("ÖLRAFFINERIE", "Ölraffinerie")]
    fn normalizes_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(raw).as_deref(), Some(expected));
    }

    #[test]
    fn rejects_names_without_words() {
        assert_eq!(normalize_name("  -- "), None);
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.register("--", 1.0, 1.0, NONE),
            Err(CalcError::InvalidRecipe { .. })
        ));
    }

    #[test]
    fn register_normalizes_rates() {
        let mut catalog = Catalog::new();
        catalog.register("Iron_Ore", 1.0, 1.0, NONE).unwrap();
        catalog
            .register("Magnetic_Ring", 1.0, 1.5, [("Iron_Ore", 1.0)])
            .unwrap();

        let ring = catalog.lookup("magnetic ring").unwrap();
        assert_relative_eq!(ring.output_rate, 1.0 / 1.5);
        assert_eq!(ring.requirements.len(), 1);
        assert_eq!(ring.requirements[0].item, "Iron_Ore");
        assert_relative_eq!(ring.requirements[0].rate_per_s, 1.0 / 1.5);
    }

    #[test]
    fn first_registration_wins() {
        let mut catalog = Catalog::new();
        let first = catalog.register("Coal", 1.0, 1.0, NONE).unwrap();
        let second = catalog.register("coal", 5.0, 1.0, NONE).unwrap();

        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(catalog.len(), 1);
        assert_relative_eq!(catalog.lookup("Coal").unwrap().output_rate, 1.0);
    }

    #[test]
    fn forward_references_are_reported_not_rejected() {
        let mut catalog = Catalog::new();
        let reg = catalog
            .register("Copper_Ingot", 1.0, 1.0, [("Copper_Ore", 1.0)])
            .unwrap();

        assert!(reg.inserted);
        assert_eq!(reg.missing, vec!["Copper_Ore".to_string()]);
        assert!(catalog.contains("copper ingot"));

        let reg = catalog.register("Copper_Ore", 1.0, 1.0, NONE).unwrap();
        assert!(reg.missing.is_empty());
    }

    #[test]
    fn duplicate_requirement_replaces_quantity() {
        let mut catalog = Catalog::new();
        catalog.register("Stone", 1.0, 1.0, NONE).unwrap();
        catalog
            .register("Glass", 1.0, 2.0, [("Stone", 1.0), ("stone", 2.0)])
            .unwrap();

        let glass = catalog.lookup("Glass").unwrap();
        assert_eq!(glass.requirements.len(), 1);
        assert_relative_eq!(glass.requirements[0].rate_per_s, 1.0);
    }

    #[rstest]
    #[case(1.0, 0.0)]
    #[case(1.0, -2.0)]
    #[case(-1.0, 1.0)]
    #[case(1.0, f64::NAN)]
    fn rejects_unusable_rates(#[case] units: f64, #[case] cycle_time: f64) {
        let mut catalog = Catalog::new();
        let err = catalog.register("Gear", units, cycle_time, NONE).unwrap_err();
        assert!(matches!(err, CalcError::InvalidRecipe { .. }));
        assert!(catalog.is_empty());
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.lookup("Unobtainium"),
            Err(CalcError::NotFound("Unobtainium".to_string()))
        );
    }
}
