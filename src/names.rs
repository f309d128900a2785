//! Canonical parameter/observation names and the container contracts
//! this crate relies on.
//!
//! Parameter names and observation names share one canonical form
//! (upper-cased, trimmed of surrounding whitespace) but are distinct
//! namespaces; nothing here conflates the two.

use std::collections::HashMap;

/// Canonicalize a parameter or observation name: trim, then upper-case.
pub fn canonicalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// The value-lookup/update contract this crate needs from a caller's
/// parameter container. Only this surface is depended upon — the crate
/// never assumes a concrete `Parameters` type.
pub trait ParameterSource {
    /// Look up a single canonical name. `None` if the name is absent.
    fn get_rec(&self, name: &str) -> Option<f64>;

    /// Look up a list of canonical names, preserving order. Fails the
    /// first name that cannot be found.
    fn get_data_vec(&self, names: &[String]) -> Result<Vec<f64>, String> {
        names
            .iter()
            .map(|n| {
                self.get_rec(n)
                    .ok_or_else(|| format!("unknown parameter '{n}'"))
            })
            .collect()
    }

    /// All canonical names currently held, in an implementation-defined
    /// but stable order.
    fn get_keys(&self) -> Vec<String>;

    /// Overwrite values for the given names, in order. Names absent from
    /// the container are inserted.
    fn update(&mut self, names: &[String], values: &[f64]);
}

/// Symmetric contract for the caller's observation container.
pub trait ObservationSink {
    /// All canonical names the container currently expects.
    fn get_keys(&self) -> Vec<String>;

    /// Overwrite values for the given names, in order.
    fn update(&mut self, names: &[String], values: &[f64]);
}

/// A simple canonical-name-keyed value container implementing both
/// [`ParameterSource`] and [`ObservationSink`]. Useful for tests and for
/// callers that don't already have a richer `Parameters`/`Observations`
/// type; not a replacement for one.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    values: HashMap<String, f64>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.values.insert(canonicalize(&name), value);
        }
        map
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(&canonicalize(name)).copied()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(canonicalize(name), value);
    }
}

impl ParameterSource for ValueMap {
    fn get_rec(&self, name: &str) -> Option<f64> {
        self.get(name)
    }

    fn get_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn update(&mut self, names: &[String], values: &[f64]) {
        for (name, value) in names.iter().zip(values) {
            self.set(name, *value);
        }
    }
}

impl ObservationSink for ValueMap {
    fn get_keys(&self) -> Vec<String> {
        ParameterSource::get_keys(self)
    }

    fn update(&mut self, names: &[String], values: &[f64]) {
        ParameterSource::update(self, names, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_trims_and_uppercases() {
        assert_eq!(canonicalize("  par1 "), "PAR1");
        assert_eq!(canonicalize("Par_2"), "PAR_2");
    }

    #[test]
    fn value_map_round_trips_case_insensitively() {
        let mut map = ValueMap::new();
        map.set("par1", 1.5);
        assert_eq!(map.get("PAR1"), Some(1.5));
        assert_eq!(map.get("par1"), Some(1.5));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn update_overwrites_and_inserts() {
        let mut map = ValueMap::new();
        map.update(&["A".to_string(), "B".to_string()], &[1.0, 2.0]);
        assert_eq!(map.get("a"), Some(1.0));
        assert_eq!(map.get("b"), Some(2.0));
        map.update(&["A".to_string()], &[9.0]);
        assert_eq!(map.get("a"), Some(9.0));
    }

    #[test]
    fn get_data_vec_errors_on_missing_name() {
        let map = ValueMap::new();
        let err = map.get_data_vec(&["MISSING".to_string()]).unwrap_err();
        assert!(err.contains("MISSING"));
    }
}
