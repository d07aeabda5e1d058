//! Node registry.

use std::collections::BTreeMap;

use mixnet_crypto::x25519::PublicKey;

use crate::config::DEFAULT_REPLAY_CACHE_CAPACITY;
use crate::error::{MixError, Result};
use crate::node::{MixNode, NodeId};
use crate::path::Route;

/// The set of mix nodes in a simulated network, keyed by [`NodeId`].
///
/// Read-only after construction. Public keys are exposed to senders; nodes
/// themselves are only reachable from inside the crate, so private keys never
/// leave their [`MixNode`].
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, MixNode>,
}

impl NodeRegistry {
    /// Generate `node_count` nodes with ids `0..node_count` and the default
    /// replay cache capacity.
    ///
    /// # Errors
    ///
    /// See [`NodeRegistry::initialize_with_capacity`].
    pub fn initialize(node_count: usize) -> Result<Self> {
        Self::initialize_with_capacity(node_count, DEFAULT_REPLAY_CACHE_CAPACITY)
    }

    /// Generate `node_count` nodes with ids `0..node_count`, each remembering
    /// at most `replay_capacity` replay tags.
    ///
    /// All-or-nothing: either every node gets a key pair or no registry is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::KeyGeneration`] if `node_count` is zero, exceeds the
    /// id space, or any key pair cannot be generated, and
    /// [`MixError::InvalidConfig`] if `replay_capacity` is zero.
    pub fn initialize_with_capacity(node_count: usize, replay_capacity: usize) -> Result<Self> {
        if node_count == 0 {
            return Err(MixError::key_generation("node count must be at least 1"));
        }
        let count = u32::try_from(node_count)
            .map_err(|_| MixError::key_generation("node count exceeds the id space"))?;

        let nodes = (0..count)
            .map(|raw| {
                let id = NodeId::new(raw);
                MixNode::generate_with_capacity(id, replay_capacity).map(|node| (id, node))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        tracing::debug!(
            nodes = nodes.len(),
            replay_capacity,
            "node registry initialized"
        );
        Ok(Self { nodes })
    }

    /// Number of registered nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty (never true for an initialized registry)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is registered
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Registered ids in ascending order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Public key of node `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::UnknownNode`] if `id` is not registered.
    pub fn public_key_of(&self, id: NodeId) -> Result<PublicKey> {
        self.nodes
            .get(&id)
            .map(MixNode::public_key)
            .ok_or(MixError::UnknownNode(id))
    }

    /// Public keys for every hop of `route`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::UnknownNode`] for the first unregistered hop.
    pub fn public_keys_for(&self, route: &Route) -> Result<Vec<PublicKey>> {
        route.iter().map(|id| self.public_key_of(id)).collect()
    }

    /// Snapshot of every node's public key.
    #[must_use]
    pub fn public_directory(&self) -> BTreeMap<NodeId, PublicKey> {
        self.nodes
            .iter()
            .map(|(id, node)| (*id, node.public_key()))
            .collect()
    }

    /// Total packets processed across all nodes
    #[must_use]
    pub fn processed_total(&self) -> usize {
        self.nodes.values().map(MixNode::processed_count).sum()
    }

    /// Replay tags currently held across all nodes
    #[must_use]
    pub fn replay_cache_total(&self) -> usize {
        self.nodes.values().map(MixNode::replay_cache_len).sum()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&MixNode> {
        self.nodes.get(&id)
    }
}
