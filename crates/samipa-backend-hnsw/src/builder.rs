//! Graph construction and the index façade.

use parking_lot::RwLock;
use tracing::{debug, info};

use samipa_common::{
    AnnIndex, DegreePolicy, HnswConfig, NodeId, Result, SamipaError, SearchHit,
};

use crate::graph::LayeredGraph;
use crate::level::LevelSampler;
use crate::math;
use crate::searcher::{Candidate, GreedySearcher};

/// Mutable index state guarded by one lock: `insert` and `clear` take the
/// write side, `search` and diagnostics the read side, so a search never
/// observes a half-linked node.
struct IndexState {
    graph: LayeredGraph,
    sampler: LevelSampler,
    /// Fixed by the first insertion
    dimension: Option<usize>,
}

/// HNSW index over unit-normalized vectors.
///
/// Vectors are copied and normalized on insert; search ranks by cosine
/// similarity. The degree policy chosen at construction decides how the
/// per-layer neighbor bound behaves and is reflected in [`AnnIndex::name`].
pub struct HnswBackend {
    config: HnswConfig,
    state: RwLock<IndexState>,
}

impl HnswBackend {
    /// Create an index with default configuration.
    pub fn new() -> Self {
        Self::from_valid(HnswConfig::default())
    }

    /// Create an index with a custom, validated configuration.
    pub fn with_config(config: HnswConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Default parameters with an explicit sampling seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_valid(HnswConfig {
            seed,
            ..HnswConfig::default()
        })
    }

    fn from_valid(config: HnswConfig) -> Self {
        let sampler = LevelSampler::new(
            config.policy.degree_parameter(),
            config.seed,
            config.max_level,
        );
        Self {
            config,
            state: RwLock::new(IndexState {
                graph: LayeredGraph::new(),
                sampler,
                dimension: None,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Neighbor bound at `layer` under the configured policy. Valid for any
    /// layer, populated or not.
    pub fn max_degree_at(&self, layer: usize) -> usize {
        self.config.policy.max_degree(layer)
    }

    /// Nodes registered at each layer, counted from the live store.
    pub fn layer_distribution(&self) -> Vec<usize> {
        self.state.read().graph.layer_distribution()
    }

    /// Mean neighbor count at `layer`.
    pub fn average_degree(&self, layer: usize) -> f64 {
        self.state.read().graph.average_degree(layer)
    }
}

impl Default for HnswBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnIndex for HnswBackend {
    fn name(&self) -> &str {
        match self.config.policy {
            DegreePolicy::Fixed { .. } => "hnsw-fixed",
            DegreePolicy::Adaptive { .. } => "hnsw-adaptive",
        }
    }

    fn insert(&self, vector: &[f32]) -> Result<NodeId> {
        if vector.is_empty() {
            return Err(SamipaError::EmptyVector);
        }

        let mut state = self.state.write();
        let state = &mut *state;

        // All failures happen before the first mutation, so a rejected
        // insert leaves no partial node behind.
        match state.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(SamipaError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            None => state.dimension = Some(vector.len()),
            Some(_) => {}
        }

        let level = state.sampler.sample();
        let previous_entry = state.graph.entry_point();

        let id = state.graph.push_vector(math::normalize(vector));
        state.graph.create_entry_layers(id, level);

        let Some((entry_node, max_level)) = previous_entry else {
            state.graph.set_entry_point(id, level);
            debug!("seeded graph with node {} at level {}", id, level);
            return Ok(id);
        };

        let query = state.graph.vector(id).to_vec();

        // Descend to the insertion layer the same way a query does.
        let mut current = entry_node;
        for layer in ((level + 1)..=max_level).rev() {
            current = GreedySearcher::new(&state.graph)
                .search_layer(&query, current, 1, layer)?[0]
                .id;
        }

        for layer in (0..=level.min(max_level)).rev() {
            let candidates = GreedySearcher::new(&state.graph).search_layer(
                &query,
                current,
                self.config.ef_construction,
                layer,
            )?;

            // Best candidates by raw similarity, no diversification.
            let bound = self.config.policy.max_degree(layer);
            for candidate in candidates.iter().take(bound) {
                state.graph.add_mutual_edge(layer, id, candidate.id);
                trim_to_bound(&mut state.graph, layer, candidate.id, bound)?;
            }

            current = candidates[0].id;
        }

        if level > max_level {
            state.graph.set_entry_point(id, level);
        }

        debug!("inserted node {} at level {}", id, level);
        Ok(id)
    }

    fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(SamipaError::InvalidParameter(
                "k must be greater than 0".to_string(),
            ));
        }
        if ef < k {
            return Err(SamipaError::InvalidParameter(format!(
                "ef ({}) must be at least k ({})",
                ef, k
            )));
        }

        let state = self.state.read();
        if state.graph.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = state.dimension {
            if query.len() != expected {
                return Err(SamipaError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let query = math::normalize(query);
        GreedySearcher::new(&state.graph).search(&query, k, ef)
    }

    fn len(&self) -> usize {
        self.state.read().graph.len()
    }

    fn max_level(&self) -> Option<usize> {
        self.state.read().graph.max_level()
    }

    fn memory_usage(&self) -> usize {
        self.state.read().graph.memory_usage()
    }

    fn clear(&self) {
        let mut state = self.state.write();
        state.graph.clear();
        state.dimension = None;
        // Re-seed so a rebuilt index reproduces the same structure.
        state.sampler = LevelSampler::new(
            self.config.policy.degree_parameter(),
            self.config.seed,
            self.config.max_level,
        );
        info!("index cleared");
    }
}

/// Evict the least-similar neighbor of `node` at `layer` once it exceeds
/// `bound`, removing both edge directions so symmetry survives trimming.
fn trim_to_bound(
    graph: &mut LayeredGraph,
    layer: usize,
    node: NodeId,
    bound: usize,
) -> Result<()> {
    if graph.neighbor_count(layer, node) <= bound {
        return Ok(());
    }

    let anchor = graph.vector(node).to_vec();
    let worst = graph
        .neighbors(layer, node)
        .into_iter()
        .map(|neighbor| {
            Ok(Candidate {
                id: neighbor,
                score: math::dot(&anchor, graph.vector(neighbor))?,
            })
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .min();

    if let Some(worst) = worst {
        graph.remove_mutual_edge(layer, node, worst.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect()
    }

    /// Exact cosine top-k over the raw dataset, the ground truth recall is
    /// measured against.
    fn brute_force_top_k(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<usize> {
        let q = math::normalize(query);
        let mut scored: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(id, v)| {
                let v = math::normalize(v);
                let score: f32 = v.iter().zip(&q).map(|(a, b)| a * b).sum();
                (id, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.into_iter().take(k).map(|(id, _)| id).collect()
    }

    fn small_config(policy: DegreePolicy, seed: u64) -> HnswConfig {
        HnswConfig {
            policy,
            ef_construction: 128,
            seed,
            max_level: None,
        }
    }

    #[test]
    fn test_new_backend_is_empty() {
        let backend = HnswBackend::new();
        assert_eq!(backend.name(), "hnsw-fixed");
        assert_eq!(backend.len(), 0);
        assert!(backend.is_empty());
        assert_eq!(backend.max_level(), None);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = HnswConfig {
            policy: DegreePolicy::Fixed { max_degree: 1 },
            ..Default::default()
        };
        assert!(matches!(
            HnswBackend::with_config(config),
            Err(SamipaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_variant_names() {
        let fixed = HnswBackend::new();
        assert_eq!(fixed.name(), "hnsw-fixed");

        let adaptive = HnswBackend::with_config(HnswConfig {
            policy: DegreePolicy::Adaptive { base_degree: 16 },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(adaptive.name(), "hnsw-adaptive");
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let backend = HnswBackend::new();
        assert_eq!(backend.insert(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(backend.insert(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(backend.insert(&[1.0, 1.0]).unwrap(), 2);
        assert_eq!(backend.len(), 3);
    }

    #[test]
    fn test_basis_vectors_scenario() {
        let backend = HnswBackend::new();
        backend.insert(&[1.0, 0.0]).unwrap();
        backend.insert(&[0.0, 1.0]).unwrap();
        backend.insert(&[1.0, 1.0]).unwrap();

        let hits = backend.search(&[1.0, 0.0], 1, 4).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_insert_empty_vector_fails() {
        let backend = HnswBackend::new();
        assert!(matches!(
            backend.insert(&[]),
            Err(SamipaError::EmptyVector)
        ));
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn test_insert_dimension_mismatch_leaves_count_unchanged() {
        let backend = HnswBackend::new();
        backend.insert(&vec![0.5; 128]).unwrap();

        let result = backend.insert(&vec![0.5; 64]);
        assert!(matches!(
            result,
            Err(SamipaError::DimensionMismatch {
                expected: 128,
                actual: 64
            })
        ));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_search_empty_graph_returns_empty() {
        let backend = HnswBackend::new();
        let hits = backend.search(&[1.0, 0.0, 0.0], 5, 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_wrong_dimension_fails() {
        let backend = HnswBackend::new();
        backend.insert(&[1.0, 0.0, 0.0]).unwrap();

        assert!(matches!(
            backend.search(&[1.0, 0.0], 1, 4),
            Err(SamipaError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_search_invalid_parameters() {
        let backend = HnswBackend::new();
        backend.insert(&[1.0, 0.0]).unwrap();

        assert!(matches!(
            backend.search(&[1.0, 0.0], 0, 4),
            Err(SamipaError::InvalidParameter(_))
        ));
        assert!(matches!(
            backend.search(&[1.0, 0.0], 5, 4),
            Err(SamipaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_vector_never_wins() {
        let backend = HnswBackend::new();
        backend.insert(&[0.0, 0.0]).unwrap();
        backend.insert(&[1.0, 0.0]).unwrap();

        let hits = backend.search(&[1.0, 0.0], 2, 4).unwrap();
        assert_eq!(hits[0].id, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, 0);
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let backend = HnswBackend::new();
        for v in random_vectors(20, 4, 5) {
            backend.insert(&v).unwrap();
        }
        assert!(backend.len() > 0);
        assert!(backend.max_level().is_some());

        backend.clear();
        assert_eq!(backend.len(), 0);
        assert_eq!(backend.max_level(), None);
        assert!(backend.search(&[1.0, 0.0, 0.0, 0.0], 3, 6).unwrap().is_empty());

        // A different dimension is accepted after clear.
        backend.insert(&[1.0, 0.0]).unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_memory_usage_grows_with_inserts() {
        let backend = HnswBackend::new();
        let empty = backend.memory_usage();
        backend.insert(&vec![0.1; 32]).unwrap();
        let one = backend.memory_usage();
        backend.insert(&vec![0.2; 32]).unwrap();

        assert!(one > empty);
        assert!(backend.memory_usage() > one);
    }

    #[test]
    fn test_level_cap_is_respected() {
        let config = HnswConfig {
            max_level: Some(2),
            ..Default::default()
        };
        let backend = HnswBackend::with_config(config).unwrap();
        for v in random_vectors(100, 4, 11) {
            backend.insert(&v).unwrap();
        }
        assert!(backend.max_level().unwrap() <= 2);
        assert!(backend.layer_distribution().len() <= 3);
    }

    #[test]
    fn test_layer_zero_holds_every_vector() {
        let backend = HnswBackend::new();
        for v in random_vectors(50, 4, 13) {
            backend.insert(&v).unwrap();
        }
        assert_eq!(backend.layer_distribution()[0], 50);
    }

    #[test]
    fn test_max_degree_at_diagnostic() {
        let adaptive = HnswBackend::with_config(HnswConfig {
            policy: DegreePolicy::Adaptive { base_degree: 16 },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(adaptive.max_degree_at(0), 16);
        let mut previous = adaptive.max_degree_at(0);
        for layer in 1..10 {
            let current = adaptive.max_degree_at(layer);
            assert!(current <= previous && current >= 1);
            previous = current;
        }

        let fixed = HnswBackend::new();
        assert_eq!(fixed.max_degree_at(0), 16);
        assert_eq!(fixed.max_degree_at(9), 16);
    }

    fn assert_structural_invariants(backend: &HnswBackend) {
        let state = backend.state.read();
        let graph = &state.graph;
        for layer in 0..graph.num_layers() {
            let bound = backend.config.policy.max_degree(layer);
            for node in 0..graph.len() {
                let neighbors = graph.neighbors(layer, node);
                assert!(
                    neighbors.len() <= bound,
                    "node {} at layer {} has {} neighbors, bound {}",
                    node,
                    layer,
                    neighbors.len(),
                    bound
                );
                for neighbor in neighbors {
                    assert!(
                        graph.neighbors(layer, neighbor).contains(&node),
                        "edge {} -> {} at layer {} is not symmetric",
                        node,
                        neighbor,
                        layer
                    );
                }
            }
        }
    }

    #[test]
    fn test_degree_bound_and_symmetry_fixed() {
        let backend = HnswBackend::with_config(small_config(
            DegreePolicy::Fixed { max_degree: 8 },
            21,
        ))
        .unwrap();
        for v in random_vectors(150, 4, 22) {
            backend.insert(&v).unwrap();
        }
        assert_structural_invariants(&backend);
    }

    #[test]
    fn test_degree_bound_and_symmetry_adaptive() {
        let backend = HnswBackend::with_config(small_config(
            DegreePolicy::Adaptive { base_degree: 8 },
            23,
        ))
        .unwrap();
        for v in random_vectors(150, 4, 24) {
            backend.insert(&v).unwrap();
        }
        assert_structural_invariants(&backend);
    }

    #[test]
    fn test_identical_seed_gives_identical_graph() {
        let build = || {
            let backend = HnswBackend::with_config(small_config(
                DegreePolicy::Fixed { max_degree: 8 },
                7,
            ))
            .unwrap();
            for v in random_vectors(60, 6, 8) {
                backend.insert(&v).unwrap();
            }
            backend
        };

        let a = build();
        let b = build();

        assert_eq!(a.layer_distribution(), b.layer_distribution());
        assert_eq!(a.memory_usage(), b.memory_usage());

        // Full adjacency comparison, layer by layer.
        {
            let state_a = a.state.read();
            let state_b = b.state.read();
            assert_eq!(state_a.graph.num_layers(), state_b.graph.num_layers());
            for layer in 0..state_a.graph.num_layers() {
                for node in 0..state_a.graph.len() {
                    assert_eq!(
                        state_a.graph.neighbors(layer, node),
                        state_b.graph.neighbors(layer, node)
                    );
                }
            }
        }

        for query in random_vectors(5, 6, 9) {
            assert_eq!(
                a.search(&query, 5, 20).unwrap(),
                b.search(&query, 5, 20).unwrap()
            );
        }
    }

    fn measure_recall(policy: DegreePolicy) -> f64 {
        let backend = HnswBackend::with_config(small_config(policy, 42)).unwrap();
        let vectors = random_vectors(200, 8, 43);
        for v in &vectors {
            backend.insert(v).unwrap();
        }

        let queries = random_vectors(10, 8, 44);
        let k = 10;
        let ef = 80;

        let mut total = 0.0;
        for query in &queries {
            let exact: std::collections::HashSet<usize> =
                brute_force_top_k(&vectors, query, k).into_iter().collect();
            let approximate = backend.search(query, k, ef).unwrap();
            let found = approximate
                .iter()
                .filter(|hit| exact.contains(&hit.id))
                .count();
            total += found as f64 / k as f64;
        }
        total / queries.len() as f64
    }

    #[test]
    fn test_recall_sanity_fixed() {
        let recall = measure_recall(DegreePolicy::Fixed { max_degree: 16 });
        assert!(recall >= 0.8, "recall@10 was {}", recall);
    }

    #[test]
    fn test_recall_sanity_adaptive() {
        let recall = measure_recall(DegreePolicy::Adaptive { base_degree: 16 });
        assert!(recall >= 0.8, "recall@10 was {}", recall);
    }

    #[test]
    fn test_search_results_sorted_and_bounded() {
        let backend = HnswBackend::new();
        for v in random_vectors(80, 4, 31) {
            backend.insert(&v).unwrap();
        }

        let hits = backend.search(&[0.3, -0.2, 0.9, 0.1], 7, 40).unwrap();
        assert!(hits.len() <= 7);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_polymorphic_use_through_trait() {
        let indexes: Vec<Box<dyn AnnIndex>> = vec![
            Box::new(HnswBackend::new()),
            Box::new(
                HnswBackend::with_config(HnswConfig {
                    policy: DegreePolicy::Adaptive { base_degree: 16 },
                    ..Default::default()
                })
                .unwrap(),
            ),
        ];

        for index in &indexes {
            index.insert(&[1.0, 0.0]).unwrap();
            index.insert(&[0.0, 1.0]).unwrap();
            let hits = index.search(&[1.0, 0.1], 1, 4).unwrap();
            assert_eq!(hits[0].id, 0);
        }
        assert_eq!(indexes[0].name(), "hnsw-fixed");
        assert_eq!(indexes[1].name(), "hnsw-adaptive");
    }
}
