//! Mix nodes and their identifiers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::DashSet;
use mixnet_crypto::constant_time::is_all_zero;
use mixnet_crypto::sphinx::ReplayTag;
use mixnet_crypto::x25519::{PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_REPLAY_CACHE_CAPACITY;
use crate::error::{MixError, Result};
use crate::packet::{LayeredPacket, PacketAdapter, PeeledPacket};

/// Identifier of a mix node, unique within one registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id as carried in packet headers.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Replay tags a node remembers, bounded to `capacity` entries.
///
/// Membership lives in a [`DashSet`] so duplicates are refused without
/// locking; the insertion order behind the mutex decides which tag goes
/// when the cache is full. Oldest tags are evicted first.
struct ReplayCache {
    capacity: usize,
    tags: DashSet<ReplayTag>,
    order: Mutex<VecDeque<ReplayTag>>,
}

impl ReplayCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tags: DashSet::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Record `tag`. Returns false if it is already cached.
    fn insert(&self, tag: ReplayTag) -> bool {
        if !self.tags.insert(tag) {
            return false;
        }

        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        order.push_back(tag);
        while order.len() > self.capacity {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.tags.remove(&oldest);
        }
        true
    }

    fn len(&self) -> usize {
        self.tags.len()
    }
}

/// A mix node.
///
/// The node owns its private key. The only operation that uses it is
/// [`MixNode::process_hop`], which also enforces the node-local replay cache.
pub struct MixNode {
    id: NodeId,
    private_key: PrivateKey,
    public_key: PublicKey,
    replay_cache: ReplayCache,
    processed: AtomicUsize,
}

impl MixNode {
    /// Generate a node with a fresh key pair and the default replay cache
    /// capacity.
    ///
    /// # Errors
    ///
    /// See [`MixNode::generate_with_capacity`].
    pub fn generate(id: NodeId) -> Result<Self> {
        Self::generate_with_capacity(id, DEFAULT_REPLAY_CACHE_CAPACITY)
    }

    /// Generate a node with a fresh key pair from the OS random source,
    /// remembering at most `replay_capacity` replay tags.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidConfig`] if `replay_capacity` is zero and
    /// [`MixError::KeyGeneration`] if randomness is unavailable or the derived
    /// public key is degenerate.
    pub fn generate_with_capacity(id: NodeId, replay_capacity: usize) -> Result<Self> {
        if replay_capacity == 0 {
            return Err(MixError::invalid_config(
                "replay cache capacity must be at least 1",
            ));
        }

        let private_key = PrivateKey::try_generate()
            .map_err(|e| MixError::KeyGeneration(e.to_string().into()))?;
        let public_key = private_key.public_key();

        if is_all_zero(public_key.as_bytes()) {
            return Err(MixError::key_generation("derived public key is the identity"));
        }

        Ok(Self {
            id,
            private_key,
            public_key,
            replay_cache: ReplayCache::new(replay_capacity),
            processed: AtomicUsize::new(0),
        })
    }

    /// Node identifier
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Public key senders encrypt this node's layer to
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Number of packets this node has accepted since it was created
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Replay tags currently remembered, never more than the capacity
    #[must_use]
    pub fn replay_cache_len(&self) -> usize {
        self.replay_cache.len()
    }

    /// Maximum number of replay tags remembered
    #[must_use]
    pub fn replay_cache_capacity(&self) -> usize {
        self.replay_cache.capacity
    }

    /// Strip this node's layer from `packet`.
    ///
    /// The replay tag is recorded only after the packet authenticates, so a
    /// forged packet cannot poison the cache. Once a tag has been evicted the
    /// node no longer recognizes that packet as a replay.
    ///
    /// # Errors
    ///
    /// - [`MixError::Integrity`] if the packet does not authenticate under
    ///   this node's key
    /// - [`MixError::Replay`] if this node has already processed the packet
    pub fn process_hop(
        &self,
        adapter: &PacketAdapter,
        packet: &LayeredPacket,
    ) -> Result<PeeledPacket> {
        let peeled = adapter.peel(&self.private_key, packet).inspect_err(|e| {
            tracing::warn!(node = %self.id, error = %e, "packet rejected");
        })?;

        if !self.replay_cache.insert(peeled.replay_tag) {
            tracing::warn!(
                node = %self.id,
                tag = %hex::encode(&peeled.replay_tag[..8]),
                "replayed packet refused"
            );
            return Err(MixError::Replay(self.id));
        }
        self.processed.fetch_add(1, Ordering::Relaxed);

        Ok(peeled)
    }
}

impl fmt::Debug for MixNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixNode")
            .field("id", &self.id)
            .field("public_key", &hex::encode(&self.public_key.as_bytes()[..8]))
            .field("processed", &self.processed_count())
            .field("replay_cache", &self.replay_cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RoutingInstruction;
    use crate::path::Route;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "node-7");
        assert_eq!(NodeId::from(3).as_u32(), 3);
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = MixNode::generate(NodeId::new(0)).unwrap();
        let b = MixNode::generate(NodeId::new(1)).unwrap();

        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(a.processed_count(), 0);
    }

    #[test]
    fn test_debug_hides_private_key() {
        let node = MixNode::generate(NodeId::new(5)).unwrap();
        let debug = format!("{node:?}");

        assert!(debug.contains("MixNode"));
        assert!(!debug.contains("private_key"));
    }

    #[test]
    fn test_process_hop_and_replay() {
        let adapter = PacketAdapter::default();
        let node = MixNode::generate(NodeId::new(0)).unwrap();
        let route = Route::new(vec![node.id()]).unwrap();
        let packet = adapter
            .construct(&route, &[node.public_key()], b"dest", b"hi")
            .unwrap();

        let peeled = node.process_hop(&adapter, &packet).unwrap();
        assert_eq!(peeled.instruction, RoutingInstruction::Deliver);
        assert_eq!(node.processed_count(), 1);

        assert_eq!(
            node.process_hop(&adapter, &packet).unwrap_err(),
            MixError::Replay(node.id())
        );
    }

    #[test]
    fn test_rejected_packet_not_cached() {
        let adapter = PacketAdapter::default();
        let owner = MixNode::generate(NodeId::new(0)).unwrap();
        let other = MixNode::generate(NodeId::new(1)).unwrap();
        let route = Route::new(vec![owner.id()]).unwrap();
        let packet = adapter
            .construct(&route, &[owner.public_key()], b"dest", b"hi")
            .unwrap();

        assert!(matches!(
            other.process_hop(&adapter, &packet),
            Err(MixError::Integrity(_))
        ));
        assert_eq!(other.processed_count(), 0);
    }

    fn single_hop_packet(adapter: &PacketAdapter, node: &MixNode) -> LayeredPacket {
        let route = Route::new(vec![node.id()]).unwrap();
        adapter
            .construct(&route, &[node.public_key()], b"dest", b"hi")
            .unwrap()
    }

    #[test]
    fn test_zero_replay_capacity_rejected() {
        assert!(matches!(
            MixNode::generate_with_capacity(NodeId::new(0), 0),
            Err(MixError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_replay_cache_stays_bounded() {
        let adapter = PacketAdapter::default();
        let node = MixNode::generate_with_capacity(NodeId::new(0), 8).unwrap();

        for _ in 0..200 {
            let packet = single_hop_packet(&adapter, &node);
            node.process_hop(&adapter, &packet).unwrap();
            assert!(node.replay_cache_len() <= 8);
        }

        assert_eq!(node.replay_cache_len(), 8);
        assert_eq!(node.replay_cache_capacity(), 8);
        assert_eq!(node.processed_count(), 200);
    }

    #[test]
    fn test_replay_cache_evicts_oldest_first() {
        let adapter = PacketAdapter::default();
        let node = MixNode::generate_with_capacity(NodeId::new(0), 2).unwrap();
        let first = single_hop_packet(&adapter, &node);
        let second = single_hop_packet(&adapter, &node);
        let third = single_hop_packet(&adapter, &node);

        node.process_hop(&adapter, &first).unwrap();
        node.process_hop(&adapter, &second).unwrap();
        node.process_hop(&adapter, &third).unwrap();

        // The two newest are still refused
        assert_eq!(
            node.process_hop(&adapter, &third).unwrap_err(),
            MixError::Replay(node.id())
        );
        assert_eq!(
            node.process_hop(&adapter, &second).unwrap_err(),
            MixError::Replay(node.id())
        );
        // The oldest has been forgotten
        assert!(node.process_hop(&adapter, &first).is_ok());
        assert_eq!(node.replay_cache_len(), 2);
    }

    #[test]
    fn test_replay_cache_bounded_under_concurrency() {
        let adapter = PacketAdapter::default();
        let node = MixNode::generate_with_capacity(NodeId::new(0), 16).unwrap();
        let packets: Vec<_> = (0..64).map(|_| single_hop_packet(&adapter, &node)).collect();

        std::thread::scope(|scope| {
            for chunk in packets.chunks(16) {
                let (node, adapter) = (&node, &adapter);
                scope.spawn(move || {
                    for packet in chunk {
                        node.process_hop(adapter, packet).unwrap();
                    }
                });
            }
        });

        assert_eq!(node.replay_cache_len(), 16);
        assert_eq!(node.processed_count(), 64);
    }
}
