//! Greedy layered graph search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use samipa_common::{NodeId, Result, SearchHit};

use crate::graph::LayeredGraph;
use crate::math;

/// Scored node used in the frontier and result lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub id: NodeId,
    pub score: f32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher similarity wins; ties fall back to the lower id so heap
        // order is stable across runs.
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Greedy search over a layered graph.
pub struct GreedySearcher<'a> {
    graph: &'a LayeredGraph,
}

impl<'a> GreedySearcher<'a> {
    pub fn new(graph: &'a LayeredGraph) -> Self {
        Self { graph }
    }

    /// Top-k hits for `query`, best first.
    ///
    /// Descends from the top level taking the single best candidate per
    /// layer as the entry point for the layer below, then widens to `ef`
    /// candidates at layer 0.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<SearchHit>> {
        let Some((entry, top_level)) = self.graph.entry_point() else {
            return Ok(Vec::new());
        };

        let mut current = entry;
        for layer in (1..=top_level).rev() {
            current = self.search_layer(query, current, 1, layer)?[0].id;
        }

        let candidates = self.search_layer(query, current, ef, 0)?;
        Ok(candidates
            .into_iter()
            .take(k)
            .map(|c| SearchHit {
                id: c.id,
                score: c.score,
            })
            .collect())
    }

    /// Up to `ef` candidates reachable from `entry` within `layer`, sorted
    /// by descending similarity.
    ///
    /// Repeatedly moves the best frontier member into the result list and
    /// pushes its unvisited neighbors with freshly computed similarity,
    /// until the frontier drains or `ef` results accumulate. The walk never
    /// backtracks and nothing outside the explored set is ranked; the
    /// resulting approximation gap is what recall measurement evaluates.
    pub(crate) fn search_layer(
        &self,
        query: &[f32],
        entry: NodeId,
        ef: usize,
        layer: usize,
    ) -> Result<Vec<Candidate>> {
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(entry);

        let mut frontier = BinaryHeap::new();
        frontier.push(Candidate {
            id: entry,
            score: math::dot(query, self.graph.vector(entry))?,
        });

        let mut results: Vec<Candidate> = Vec::with_capacity(ef);

        while results.len() < ef {
            let Some(current) = frontier.pop() else {
                break;
            };
            results.push(current);

            for neighbor in self.graph.neighbors(layer, current.id) {
                if visited.insert(neighbor) {
                    frontier.push(Candidate {
                        id: neighbor,
                        score: math::dot(query, self.graph.vector(neighbor))?,
                    });
                }
            }
        }

        // A later expansion can outscore an earlier pop, so pop order alone
        // is not sorted.
        results.sort_unstable_by(|a, b| b.cmp(a));
        Ok(results)
    }
}
