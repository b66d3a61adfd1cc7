//! Layered adjacency storage for the HNSW hierarchy.

use std::collections::{HashMap, HashSet};
use std::mem;

use samipa_common::{NodeId, Vector};

/// Estimated bytes per (layer, node) adjacency slot: map entry plus set
/// header.
const SLOT_OVERHEAD: usize = 48;

/// Multi-layer graph state: vector storage, per-layer adjacency, and the
/// entry point with its level.
///
/// Adjacency is kept as index-keyed sets so duplicate-edge checks are O(1),
/// and every edge is stored in both directions. The store is not internally
/// synchronized; the owning backend serializes access through a single
/// read-write lock.
pub struct LayeredGraph {
    /// Stored vectors, unit-normalized at insertion, indexed by `NodeId`
    vectors: Vec<Vector>,
    /// layer -> node -> neighbor set
    layers: Vec<HashMap<NodeId, HashSet<NodeId>>>,
    /// Entry node and its level; `None` while the graph is empty
    entry_point: Option<(NodeId, usize)>,
}

impl LayeredGraph {
    pub fn new() -> Self {
        Self {
            vectors: Vec::new(),
            layers: Vec::new(),
            entry_point: None,
        }
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Number of materialized layers
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Entry node and its level
    pub fn entry_point(&self) -> Option<(NodeId, usize)> {
        self.entry_point
    }

    pub fn set_entry_point(&mut self, node: NodeId, level: usize) {
        self.entry_point = Some((node, level));
    }

    /// Highest populated layer; `None` while the graph is empty
    pub fn max_level(&self) -> Option<usize> {
        self.entry_point.map(|(_, level)| level)
    }

    /// Append a vector and return its dense, insertion-ordered index.
    pub fn push_vector(&mut self, vector: Vector) -> NodeId {
        self.vectors.push(vector);
        self.vectors.len() - 1
    }

    /// Stored vector for `id`.
    ///
    /// Indices are dense and never reused, so any id obtained from this
    /// graph stays valid for its lifetime.
    pub fn vector(&self, id: NodeId) -> &[f32] {
        &self.vectors[id]
    }

    /// Register `node` with an empty neighbor set at every layer
    /// `0..=upto_level`, growing the layer list as needed.
    pub fn create_entry_layers(&mut self, node: NodeId, upto_level: usize) {
        while self.layers.len() <= upto_level {
            self.layers.push(HashMap::new());
        }
        for layer in self.layers.iter_mut().take(upto_level + 1) {
            layer.entry(node).or_default();
        }
    }

    /// Insert the edge `a <-> b` at `layer`, both directions, idempotently.
    /// Self-edges are ignored.
    pub fn add_mutual_edge(&mut self, layer: usize, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        while self.layers.len() <= layer {
            self.layers.push(HashMap::new());
        }
        let adjacency = &mut self.layers[layer];
        adjacency.entry(a).or_default().insert(b);
        adjacency.entry(b).or_default().insert(a);
    }

    /// Remove the edge `a <-> b` at `layer`, both directions.
    pub fn remove_mutual_edge(&mut self, layer: usize, a: NodeId, b: NodeId) {
        if let Some(adjacency) = self.layers.get_mut(layer) {
            if let Some(neighbors) = adjacency.get_mut(&a) {
                neighbors.remove(&b);
            }
            if let Some(neighbors) = adjacency.get_mut(&b) {
                neighbors.remove(&a);
            }
        }
    }

    /// Neighbors of `node` at `layer`, sorted ascending by id so traversal
    /// order is stable across runs. Empty if the node is absent at `layer`.
    pub fn neighbors(&self, layer: usize, node: NodeId) -> Vec<NodeId> {
        let Some(adjacency) = self.layers.get(layer) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeId> = adjacency
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        neighbors.sort_unstable();
        neighbors
    }

    /// Neighbor count of `node` at `layer`.
    pub fn neighbor_count(&self, layer: usize, node: NodeId) -> usize {
        self.layers
            .get(layer)
            .and_then(|adjacency| adjacency.get(&node))
            .map_or(0, HashSet::len)
    }

    /// Deterministic estimate of resident bytes: vector payloads and
    /// containers, adjacency entries, per-slot overhead, and the store
    /// itself.
    pub fn memory_usage(&self) -> usize {
        let vector_bytes: usize = self
            .vectors
            .iter()
            .map(|v| v.len() * mem::size_of::<f32>() + mem::size_of::<Vector>())
            .sum();

        let mut slots = 0usize;
        let mut edge_entries = 0usize;
        for layer in &self.layers {
            slots += layer.len();
            edge_entries += layer.values().map(HashSet::len).sum::<usize>();
        }

        vector_bytes
            + edge_entries * mem::size_of::<NodeId>()
            + slots * SLOT_OVERHEAD
            + mem::size_of::<Self>()
    }

    /// Nodes registered at each layer, counted from the live store.
    pub fn layer_distribution(&self) -> Vec<usize> {
        self.layers.iter().map(HashMap::len).collect()
    }

    /// Mean neighbor count at `layer`; 0.0 for an empty or missing layer.
    pub fn average_degree(&self, layer: usize) -> f64 {
        let Some(adjacency) = self.layers.get(layer) else {
            return 0.0;
        };
        if adjacency.is_empty() {
            return 0.0;
        }
        let edges: usize = adjacency.values().map(HashSet::len).sum();
        edges as f64 / adjacency.len() as f64
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.layers.clear();
        self.entry_point = None;
    }
}

impl Default for LayeredGraph {
    fn default() -> Self {
        Self::new()
    }
}
