//! Information-state regret table.
//!
//! One entry per information state holds the cumulative regret, the
//! cumulative strategy weight and the current strategy derived from the
//! regrets. The table is the single owner of this data; current and average
//! strategies are read from it, never stored elsewhere.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Per-information-state bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoStateEntry {
    /// Player acting at this information state.
    pub player: usize,
    /// Names of the legal actions, in legal-action order.
    pub action_names: Vec<String>,
    /// Cumulative counterfactual regret per action.
    pub cumulative_regret: Vec<f64>,
    /// Cumulative average-strategy weight per action.
    pub cumulative_strategy_weight: Vec<f64>,
    /// Strategy obtained from regret matching on `cumulative_regret`.
    pub current_strategy: Vec<f64>,
}

impl InfoStateEntry {
    /// Fresh entry: zero regret and weight, uniform current strategy.
    pub fn new(player: usize, action_names: Vec<String>) -> Self {
        let num_actions = action_names.len();
        Self {
            player,
            action_names,
            cumulative_regret: vec![0.0; num_actions],
            cumulative_strategy_weight: vec![0.0; num_actions],
            current_strategy: uniform(num_actions),
        }
    }

    /// Number of legal actions.
    pub fn num_actions(&self) -> usize {
        self.action_names.len()
    }

    /// Normalized cumulative strategy weight, uniform if never weighted.
    pub fn average_strategy(&self) -> Vec<f64> {
        let total: f64 = self.cumulative_strategy_weight.iter().sum();
        if total > 0.0 {
            self.cumulative_strategy_weight.iter().map(|&w| w / total).collect()
        } else {
            uniform(self.num_actions())
        }
    }

    fn rebuild_current_strategy(&mut self) {
        // Regret matching: strategy proportional to positive regrets
        let positive_sum: f64 = self.cumulative_regret.iter().map(|&r| r.max(0.0)).sum();

        if positive_sum > 0.0 {
            for (p, &r) in self.current_strategy.iter_mut().zip(&self.cumulative_regret) {
                *p = r.max(0.0) / positive_sum;
            }
        } else {
            self.current_strategy = uniform(self.num_actions());
        }
    }
}

/// Uniform distribution over `num_actions` actions.
pub fn uniform(num_actions: usize) -> Vec<f64> {
    if num_actions == 0 {
        return Vec::new();
    }
    vec![1.0 / num_actions as f64; num_actions]
}

/// Storage for regrets and strategy weights of every tracked information state.
///
/// Mutation requires `&mut self`; at most one solver drives a table at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegretTable {
    entries: FxHashMap<String, InfoStateEntry>,
}

impl RegretTable {
    /// Create new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Entry for `key`, inserting a fresh one if the state is new.
    pub fn entry_or_insert(
        &mut self,
        key: &str,
        player: usize,
        action_names: impl FnOnce() -> Vec<String>,
    ) -> &mut InfoStateEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| InfoStateEntry::new(player, action_names()))
    }

    /// Get an entry by key.
    pub fn get(&self, key: &str) -> Option<&InfoStateEntry> {
        self.entries.get(key)
    }

    /// Current strategy at `key`, if the state is tracked.
    pub fn current_strategy(&self, key: &str) -> Option<&[f64]> {
        self.entries.get(key).map(|e| e.current_strategy.as_slice())
    }

    /// Average strategy at `key`, if the state is tracked.
    pub fn average_strategy(&self, key: &str) -> Option<Vec<f64>> {
        self.entries.get(key).map(InfoStateEntry::average_strategy)
    }

    /// Add an instantaneous regret vector to the state's cumulative regret.
    ///
    /// Untracked keys are ignored.
    pub fn add_regrets(&mut self, key: &str, regrets: &[f64]) {
        if let Some(entry) = self.entries.get_mut(key) {
            debug_assert_eq!(
                entry.num_actions(),
                regrets.len(),
                "Action count mismatch for info set {}",
                key
            );
            for (cumulative, &r) in entry.cumulative_regret.iter_mut().zip(regrets) {
                *cumulative += r;
            }
        }
    }

    /// Add `reach_weight * current_strategy[a]` to every action's weight.
    ///
    /// `reach_weight` already includes the iteration weighting.
    pub fn accumulate_average(&mut self, key: &str, reach_weight: f64) {
        if let Some(entry) = self.entries.get_mut(key) {
            for (weight, &p) in entry
                .cumulative_strategy_weight
                .iter_mut()
                .zip(&entry.current_strategy)
            {
                *weight += reach_weight * p;
            }
        }
    }

    /// Clamp every negative cumulative regret to zero.
    pub fn reset_negative_regrets(&mut self) {
        for entry in self.entries.values_mut() {
            for r in entry.cumulative_regret.iter_mut() {
                if *r < 0.0 {
                    *r = 0.0;
                }
            }
        }
    }

    /// Recompute the current strategy of every entry from its regrets.
    pub fn rebuild_current_strategy(&mut self) {
        for entry in self.entries.values_mut() {
            entry.rebuild_current_strategy();
        }
    }

    /// Current strategies of all entries, keyed by information state.
    pub fn current_strategies(&self) -> FxHashMap<String, Vec<f64>> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.current_strategy.clone()))
            .collect()
    }

    /// Average strategies of all entries, keyed by information state.
    pub fn average_strategies(&self) -> FxHashMap<String, Vec<f64>> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.average_strategy()))
            .collect()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &InfoStateEntry)> {
        self.entries.iter()
    }

    /// Get the number of information states stored.
    pub fn num_info_sets(&self) -> usize {
        self.entries.len()
    }

    /// Check if an information state is tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Clear all stored data.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Export table to serializable format.
    pub fn export(&self) -> StorageExport {
        StorageExport {
            entries: self.entries.clone(),
        }
    }

    /// Import table from serialized format.
    pub fn import(&mut self, data: StorageExport) {
        self.entries = data.entries;
    }
}

/// Serializable export format for the regret table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageExport {
    /// All entries keyed by information state.
    pub entries: FxHashMap<String, InfoStateEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("a{}", i)).collect()
    }

    fn table_with(key: &str, n: usize) -> RegretTable {
        let mut table = RegretTable::new();
        table.entry_or_insert(key, 0, || names(n));
        table
    }

    #[test]
    fn test_new_entry_is_uniform() {
        let table = table_with("s", 4);
        let current = table.current_strategy("s").unwrap();
        assert_eq!(current, &[0.25, 0.25, 0.25, 0.25]);
        assert_eq!(table.average_strategy("s").unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn test_rebuild_is_proportional_to_positive_regret() {
        let mut table = table_with("s", 3);
        table.add_regrets("s", &[3.0, 1.0, -2.0]);
        table.rebuild_current_strategy();

        let current = table.current_strategy("s").unwrap();
        assert!((current[0] - 0.75).abs() < 1e-12);
        assert!((current[1] - 0.25).abs() < 1e-12);
        assert_eq!(current[2], 0.0);
    }

    #[test]
    fn test_reset_clamps_negative_regrets() {
        let mut table = table_with("s", 2);
        table.add_regrets("s", &[-5.0, 2.0]);
        table.reset_negative_regrets();

        let entry = table.get("s").unwrap();
        assert_eq!(entry.cumulative_regret, vec![0.0, 2.0]);
        assert!(entry.cumulative_regret.iter().all(|&r| r >= 0.0));
    }

    #[test]
    fn test_all_zero_regret_falls_back_to_uniform() {
        let mut table = table_with("s", 2);
        table.add_regrets("s", &[-1.0, -1.0]);
        table.reset_negative_regrets();
        table.rebuild_current_strategy();
        assert_eq!(table.current_strategy("s").unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn test_accumulate_average_uses_current_strategy() {
        let mut table = table_with("s", 2);
        table.add_regrets("s", &[1.0, 0.0]);
        table.rebuild_current_strategy();
        table.accumulate_average("s", 2.0);

        // Iteration-weighted second contribution from a uniform strategy
        table.add_regrets("s", &[-1.0, 0.0]);
        table.reset_negative_regrets();
        table.rebuild_current_strategy();
        table.accumulate_average("s", 2.0);

        let entry = table.get("s").unwrap();
        assert_eq!(entry.cumulative_strategy_weight, vec![3.0, 1.0]);
        let average = table.average_strategy("s").unwrap();
        assert!((average[0] - 0.75).abs() < 1e-12);
        assert!((average.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_untracked_keys_are_ignored() {
        let mut table = RegretTable::new();
        table.add_regrets("missing", &[1.0]);
        table.accumulate_average("missing", 1.0);
        assert_eq!(table.num_info_sets(), 0);
        assert!(table.current_strategy("missing").is_none());
    }

    #[test]
    fn test_export_import() {
        let mut table = table_with("s", 2);
        table.add_regrets("s", &[1.0, 2.0]);
        table.rebuild_current_strategy();

        let json = serde_json::to_string(&table.export()).unwrap();
        let data: StorageExport = serde_json::from_str(&json).unwrap();

        let mut restored = RegretTable::new();
        restored.import(data);
        assert_eq!(restored, table);
    }
}
