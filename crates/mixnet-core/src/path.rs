//! Route selection.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{MixError, Result};
use crate::node::NodeId;
use crate::registry::NodeRegistry;

/// Ordered, duplicate-free list of hops a packet traverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    hops: Vec<NodeId>,
}

impl Route {
    /// Create a route from an explicit hop list.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidRoute`] if `hops` is empty or names a node
    /// more than once.
    pub fn new(hops: Vec<NodeId>) -> Result<Self> {
        if hops.is_empty() {
            return Err(MixError::invalid_route("route has no hops"));
        }

        let mut seen = HashSet::with_capacity(hops.len());
        if !hops.iter().all(|id| seen.insert(*id)) {
            return Err(MixError::invalid_route("route repeats a node"));
        }

        Ok(Self { hops })
    }

    /// Hops in traversal order
    #[must_use]
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// Number of hops
    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Entry node
    #[must_use]
    pub fn first(&self) -> NodeId {
        self.hops[0]
    }

    /// Iterate over hops in order
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.hops.iter().copied()
    }

    /// Whether the route passes through `id`
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.hops.contains(&id)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{hop}")?;
        }
        Ok(())
    }
}

/// Picks routes uniformly at random from the eligible nodes of a registry.
///
/// Nodes in the exclusion set never appear in a route. With an empty set,
/// any registered node may serve as any hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSelector {
    path_length: usize,
    excluded: BTreeSet<NodeId>,
}

impl PathSelector {
    /// Create a selector for routes of `path_length` hops
    #[must_use]
    pub fn new(path_length: usize) -> Self {
        Self {
            path_length,
            excluded: BTreeSet::new(),
        }
    }

    /// Exclude `ids` from every route
    #[must_use]
    pub fn with_exclusions(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.excluded.extend(ids);
        self
    }

    /// Exclude a single node
    pub fn exclude(&mut self, id: NodeId) {
        self.excluded.insert(id);
    }

    /// Configured route length
    #[must_use]
    pub fn path_length(&self) -> usize {
        self.path_length
    }

    /// Excluded nodes
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<NodeId> {
        &self.excluded
    }

    /// Select a route using the thread-local RNG.
    ///
    /// # Errors
    ///
    /// See [`PathSelector::select_route_with`].
    pub fn select_route(&self, registry: &NodeRegistry) -> Result<Route> {
        self.select_route_with(registry, &mut rand::thread_rng())
    }

    /// Select `path_length` distinct eligible nodes in random order.
    ///
    /// # Errors
    ///
    /// - [`MixError::InvalidRoute`] if the path length is zero
    /// - [`MixError::InsufficientNodes`] if fewer eligible nodes than hops
    pub fn select_route_with<R: Rng + ?Sized>(
        &self,
        registry: &NodeRegistry,
        rng: &mut R,
    ) -> Result<Route> {
        if self.path_length == 0 {
            return Err(MixError::invalid_route("path length must be at least 1"));
        }

        let mut eligible: Vec<NodeId> = registry
            .node_ids()
            .filter(|id| !self.excluded.contains(id))
            .collect();

        if self.path_length > eligible.len() {
            return Err(MixError::InsufficientNodes {
                requested: self.path_length,
                available: eligible.len(),
            });
        }

        let (chosen, _) = eligible.partial_shuffle(rng, self.path_length);
        Route::new(chosen.to_vec())
    }
}

/// Select a route of `path_length` hops with no exclusions.
///
/// # Errors
///
/// See [`PathSelector::select_route_with`].
pub fn select_route(registry: &NodeRegistry, path_length: usize) -> Result<Route> {
    PathSelector::new(path_length).select_route(registry)
}
