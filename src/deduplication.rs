// 🔍 Deduplication Engine - collapse near-duplicate normalized keys into one entity
// Two strategies: character ratio, token-wise singular/plural match
//
// The pass is pairwise and order dependent on purpose: keys are visited in
// ascending order, an earlier key absorbs later keys, and an absorbed key is
// frozen. A ~ B and B ~ C does not put A and C together unless A ~ C.

use crate::records::RawFiling;
use crate::similarity::{sequence_ratio, token_plural_cost};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Character-level ratio above the threshold
    SequenceRatio,

    /// Same token count, tokens equal up to a trailing plural "s"
    PluralTokens,
}

// ============================================================================
// MERGE DECISION
// ============================================================================

/// One absorbed key, kept for logging and audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeDecision {
    /// Surviving (lexicographically earlier) key
    pub survivor: String,

    /// Key whose filings moved into the survivor
    pub absorbed: String,

    pub ratio: f64,

    pub strategy: MergeStrategy,
}

// ============================================================================
// CLUSTER ARENA
// ============================================================================

/// Working set of filings grouped under one key
#[derive(Debug, Clone)]
pub struct EntityCluster {
    pub key: String,
    pub filings: Vec<RawFiling>,
    /// Arena index of the cluster that absorbed this one
    absorbed_into: Option<usize>,
}

impl EntityCluster {
    pub fn is_live(&self) -> bool {
        self.absorbed_into.is_none()
    }
}

/// Indexed arena of clusters with a key → index map.
/// Clusters are stored in ascending key order, so index order is key order.
#[derive(Debug, Clone, Default)]
pub struct ClusterArena {
    clusters: Vec<EntityCluster>,
    index: HashMap<String, usize>,
}

impl ClusterArena {
    /// Build the arena from grouped filings
    pub fn from_groups(groups: BTreeMap<String, Vec<RawFiling>>) -> Self {
        let mut arena = ClusterArena::default();
        for (key, filings) in groups {
            arena.index.insert(key.clone(), arena.clusters.len());
            arena.clusters.push(EntityCluster {
                key,
                filings,
                absorbed_into: None,
            });
        }
        arena
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_live()).count()
    }

    /// Key of the live cluster that now holds `key`'s filings
    pub fn resolve(&self, key: &str) -> Option<&str> {
        let mut idx = *self.index.get(key)?;
        while let Some(parent) = self.clusters[idx].absorbed_into {
            idx = parent;
        }
        Some(self.clusters[idx].key.as_str())
    }

    /// Move `absorbed`'s filings to the end of `survivor` and freeze it
    fn absorb(&mut self, survivor: usize, absorbed: usize) {
        let moved = std::mem::take(&mut self.clusters[absorbed].filings);
        self.clusters[survivor].filings.extend(moved);
        self.clusters[absorbed].absorbed_into = Some(survivor);
    }

    /// Consume the arena, yielding live clusters in ascending key order
    pub fn into_live(self) -> Vec<EntityCluster> {
        self.clusters.into_iter().filter(|c| c.is_live()).collect()
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine {
    /// Ratio strictly above this merges (default: 0.95)
    pub ratio_threshold: f64,

    /// Cost of one singular/plural token pair (default: 0.1)
    pub plural_token_cost: f64,

    /// Summed token cost strictly below this merges (default: 0.2)
    pub token_cost_threshold: f64,
}

impl DeduplicationEngine {
    /// Create engine with default thresholds
    pub fn new() -> Self {
        DeduplicationEngine {
            ratio_threshold: 0.95,
            plural_token_cost: 0.1,
            token_cost_threshold: 0.2,
        }
    }

    /// Decide whether two keys denote the same entity
    pub fn compare(&self, earlier: &str, later: &str) -> Option<MergeDecision> {
        let ratio = sequence_ratio(earlier, later);

        let strategy = if ratio > self.ratio_threshold {
            MergeStrategy::SequenceRatio
        } else {
            match token_plural_cost(earlier, later, self.plural_token_cost) {
                Some(cost) if cost < self.token_cost_threshold => MergeStrategy::PluralTokens,
                _ => return None,
            }
        };

        Some(MergeDecision {
            survivor: earlier.to_string(),
            absorbed: later.to_string(),
            ratio,
            strategy,
        })
    }

    /// Run the single merge pass over the arena, returning every merge made.
    ///
    /// Each live key is compared with every later live key exactly once.
    pub fn merge(&self, arena: &mut ClusterArena) -> Vec<MergeDecision> {
        let mut decisions = Vec::new();

        for i in 0..arena.clusters.len() {
            if !arena.clusters[i].is_live() {
                continue;
            }

            for j in (i + 1)..arena.clusters.len() {
                if !arena.clusters[j].is_live() {
                    continue;
                }

                let decision = self.compare(&arena.clusters[i].key, &arena.clusters[j].key);
                if let Some(decision) = decision {
                    debug!(
                        survivor = %decision.survivor,
                        absorbed = %decision.absorbed,
                        ratio = decision.ratio,
                        strategy = ?decision.strategy,
                        "merging near-duplicate entity keys"
                    );
                    arena.absorb(i, j);
                    decisions.push(decision);
                }
            }
        }

        decisions
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_of(keys: &[&str]) -> ClusterArena {
        let groups: BTreeMap<String, Vec<RawFiling>> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.to_string(), vec![RawFiling::new(&i.to_string(), key)]))
            .collect();
        ClusterArena::from_groups(groups)
    }

    fn live_keys(arena: ClusterArena) -> Vec<(String, usize)> {
        arena
            .into_live()
            .into_iter()
            .map(|c| (c.key, c.filings.len()))
            .collect()
    }

    #[test]
    fn test_plural_pair_merges_into_earlier_key() {
        let engine = DeduplicationEngine::new();
        let mut arena = arena_of(&["stratus networks", "stratus network"]);

        let decisions = engine.merge(&mut arena);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].survivor, "stratus network");
        assert_eq!(decisions[0].absorbed, "stratus networks");
        assert_eq!(arena.resolve("stratus networks"), Some("stratus network"));
        assert_eq!(live_keys(arena), vec![("stratus network".to_string(), 2)]);
    }

    #[test]
    fn test_three_keys_only_plural_pair_merges() {
        let engine = DeduplicationEngine::new();
        let mut arena = arena_of(&["alpha networks", "alpha network", "alpha netwerks"]);

        engine.merge(&mut arena);

        assert_eq!(
            live_keys(arena),
            vec![
                ("alpha netwerks".to_string(), 1),
                ("alpha network".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_plural_tokens_strategy_below_ratio() {
        let engine = DeduplicationEngine::new();

        // short keys keep the ratio under the threshold
        let decision = engine.compare("ab net", "abs net").unwrap();
        assert!(decision.ratio <= 0.95);
        assert_eq!(decision.strategy, MergeStrategy::PluralTokens);

        let decision = engine.compare("alpha network", "alpha networks").unwrap();
        assert_eq!(decision.strategy, MergeStrategy::SequenceRatio);
    }

    #[test]
    fn test_two_plural_differences_do_not_merge() {
        let engine = DeduplicationEngine::new();
        assert!(engine.compare("ab cd", "abs cds").is_none());
    }

    #[test]
    fn test_absorbed_key_is_frozen() {
        // A ~ B and B ~ C, but A !~ C: C stays on its own
        let engine = DeduplicationEngine::new();
        let a = "ab cd";
        let b = "ab cds";
        let c = "abs cds";

        assert!(engine.compare(a, b).is_some());
        assert!(engine.compare(b, c).is_some());
        assert!(engine.compare(a, c).is_none());

        let mut arena = arena_of(&[c, b, a]);
        let decisions = engine.merge(&mut arena);

        assert_eq!(decisions.len(), 1);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.resolve(c), Some(c));
        assert_eq!(
            live_keys(arena),
            vec![(a.to_string(), 2), (c.to_string(), 1)]
        );
    }

    #[test]
    fn test_survivor_absorbs_several_keys() {
        let engine = DeduplicationEngine::new();
        let mut arena = arena_of(&["lumen telecomx", "lumen telecoms", "lumen telecom"]);

        let decisions = engine.merge(&mut arena);

        assert_eq!(decisions.len(), 2);
        assert_eq!(live_keys(arena), vec![("lumen telecom".to_string(), 3)]);
    }

    #[test]
    fn test_absorbed_filings_are_appended_in_order() {
        let engine = DeduplicationEngine::new();
        let mut groups = BTreeMap::new();
        groups.insert(
            "beta voice".to_string(),
            vec![RawFiling::new("1", "Beta Voice"), RawFiling::new("2", "Beta Voice")],
        );
        groups.insert("beta voices".to_string(), vec![RawFiling::new("3", "Beta Voices")]);
        let mut arena = ClusterArena::from_groups(groups);

        engine.merge(&mut arena);

        let clusters = arena.into_live();
        let ids: Vec<&str> = clusters[0]
            .filings
            .iter()
            .map(|f| f.submission_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_unrelated_keys_stay_distinct() {
        let engine = DeduplicationEngine::new();
        let mut arena = arena_of(&["bandwidth", "twilio", "vonage"]);

        assert!(engine.merge(&mut arena).is_empty());
        assert_eq!(arena.live_count(), 3);
    }
}
