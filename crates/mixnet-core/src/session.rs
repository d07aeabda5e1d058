//! Send sessions.
//!
//! A [`Mixnet`] owns a shared [`NodeRegistry`] and turns a message into a
//! delivery: select a route, wrap the message once per hop, drive the packet
//! through the nodes, and hand back what the final hop recovered.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::MixnetConfig;
use crate::error::{MixError, Result};
use crate::packet::{LayeredPacket, PacketAdapter};
use crate::path::{PathSelector, Route};
use crate::registry::NodeRegistry;
use crate::relay::{Delivered, RelayDriver, RelayState};

/// Message as recovered by the final hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Destination label carried in the body
    pub destination: String,
    /// Recovered message
    pub message: String,
    /// Hops the packet traversed
    pub hops: usize,
}

impl TryFrom<Delivered> for Delivery {
    type Error = MixError;

    fn try_from(delivered: Delivered) -> Result<Self> {
        let destination = String::from_utf8(delivered.destination)
            .map_err(|_| MixError::Integrity("destination label is not UTF-8".into()))?;
        let message = String::from_utf8(delivered.message)
            .map_err(|_| MixError::Integrity("message is not UTF-8".into()))?;

        Ok(Self {
            destination,
            message,
            hops: delivered.hops,
        })
    }
}

/// Outcome of one send
pub type SessionResult = Result<Delivery>;

/// A simulated mix network ready to carry messages.
///
/// Cheap to share behind an [`Arc`]; concurrent sends share only the
/// registry.
#[derive(Debug)]
pub struct Mixnet {
    registry: Arc<NodeRegistry>,
    selector: PathSelector,
    adapter: PacketAdapter,
    session_timeout: Duration,
}

impl Mixnet {
    /// Validate `config` and generate a fresh registry for it.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidConfig`] or [`MixError::KeyGeneration`].
    pub fn new(config: &MixnetConfig) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(NodeRegistry::initialize_with_capacity(
            config.node_count,
            config.replay_cache_capacity,
        )?);
        Self::with_registry(registry, config)
    }

    /// Run sessions over an existing registry.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::InvalidConfig`] if `config` is invalid.
    pub fn with_registry(registry: Arc<NodeRegistry>, config: &MixnetConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            registry,
            selector: PathSelector::new(config.path_length)
                .with_exclusions(config.excluded.iter().copied()),
            adapter: PacketAdapter::new(config.sphinx_params()?),
            session_timeout: config.session_timeout,
        })
    }

    /// Shared node registry
    #[must_use]
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Route selector
    #[must_use]
    pub fn selector(&self) -> &PathSelector {
        &self.selector
    }

    /// Packet adapter
    #[must_use]
    pub fn adapter(&self) -> &PacketAdapter {
        &self.adapter
    }

    /// Configured deadline for timed sends
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    fn prepare(&self, message: &str, destination: &str) -> Result<(Route, LayeredPacket)> {
        let route = self.selector.select_route(&self.registry)?;
        let keys = self.registry.public_keys_for(&route)?;
        let packet =
            self.adapter
                .construct(&route, &keys, destination.as_bytes(), message.as_bytes())?;

        tracing::debug!(hops = route.len(), size = packet.size(), "packet constructed");
        Ok((route, packet))
    }

    /// Send `message` to `destination` over a freshly selected route.
    ///
    /// Not idempotent: every call picks a new route and a new packet.
    ///
    /// # Errors
    ///
    /// Any [`MixError`] raised while selecting, building or relaying.
    pub fn send(&self, message: &str, destination: &str) -> SessionResult {
        let result = self.prepare(message, destination).and_then(|(route, packet)| {
            RelayDriver::new(&self.registry, &self.adapter)
                .run(&route, packet)
                .and_then(Delivery::try_from)
        });

        log_outcome(&result);
        result
    }

    /// Like [`Mixnet::send`], yielding to the runtime between hops and
    /// giving up once `timeout` has elapsed.
    ///
    /// # Errors
    ///
    /// Any error of [`Mixnet::send`], or [`MixError::Timeout`] if the packet
    /// is still in flight at the deadline.
    pub async fn send_with_timeout(
        &self,
        message: &str,
        destination: &str,
        timeout: Duration,
    ) -> SessionResult {
        let deadline = Instant::now() + timeout;
        let result = match self.prepare(message, destination) {
            Ok((route, packet)) => self.relay_until(&route, packet, deadline, timeout).await,
            Err(e) => Err(e),
        };

        log_outcome(&result);
        result
    }

    async fn relay_until(
        &self,
        route: &Route,
        packet: LayeredPacket,
        deadline: Instant,
        timeout: Duration,
    ) -> SessionResult {
        let driver = RelayDriver::new(&self.registry, &self.adapter);
        let mut state = driver.start(route, packet);

        loop {
            state = match driver.step(state) {
                RelayState::Delivered(delivered) => return Delivery::try_from(delivered),
                RelayState::Failed { error, .. } => return Err(error),
                in_flight => in_flight,
            };

            if Instant::now() >= deadline {
                tracing::debug!(hops = state.hops(), "deadline reached, packet abandoned");
                return Err(MixError::Timeout(timeout));
            }
            tokio::task::yield_now().await;
        }
    }
}

fn log_outcome(result: &SessionResult) {
    match result {
        Ok(delivery) => tracing::info!(hops = delivery.hops, "message delivered"),
        Err(e) => tracing::warn!(kind = e.kind(), error = %e, "send failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_DESTINATION;
    use crate::node::NodeId;

    fn mixnet(node_count: usize, path_length: usize) -> Mixnet {
        Mixnet::new(&MixnetConfig {
            node_count,
            path_length,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_send_hello() {
        let net = mixnet(10, 5);
        let delivery = net.send("hello", DEFAULT_DESTINATION).unwrap();

        assert_eq!(delivery.message, "hello");
        assert_eq!(delivery.destination, "destination_node");
        assert_eq!(delivery.hops, 5);
    }

    #[test]
    fn test_send_empty_and_unicode() {
        let net = mixnet(4, 3);

        assert_eq!(net.send("", "d").unwrap().message, "");
        assert_eq!(net.send("héllo wörld ✓", "d").unwrap().message, "héllo wörld ✓");
    }

    #[test]
    fn test_insufficient_nodes() {
        let net = mixnet(3, 6);

        assert_eq!(
            net.send("hello", DEFAULT_DESTINATION).unwrap_err(),
            MixError::InsufficientNodes {
                requested: 6,
                available: 3
            }
        );
    }

    #[test]
    fn test_oversized_message() {
        let net = mixnet(5, 3);
        let message = "x".repeat(net.adapter().params().payload_size());

        assert!(matches!(
            net.send(&message, DEFAULT_DESTINATION),
            Err(MixError::PacketConstruction(_))
        ));
    }

    #[test]
    fn test_repeated_sends_are_independent() {
        let net = mixnet(6, 3);

        for i in 0..5 {
            let message = format!("message {i}");
            assert_eq!(net.send(&message, "d").unwrap().message, message);
        }
        assert_eq!(net.registry().processed_total(), 15);
    }

    #[test]
    fn test_excluded_nodes_unused() {
        let registry = Arc::new(NodeRegistry::initialize(4).unwrap());
        let config = MixnetConfig {
            node_count: 4,
            path_length: 3,
            excluded: [NodeId::new(2)].into_iter().collect(),
            ..Default::default()
        };
        let net = Mixnet::with_registry(Arc::clone(&registry), &config).unwrap();

        for _ in 0..10 {
            net.send("m", "d").unwrap();
        }
        assert_eq!(registry.node(NodeId::new(2)).unwrap().processed_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MixnetConfig {
            node_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            Mixnet::new(&config),
            Err(MixError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_long_running_network_memory_is_bounded() {
        let net = Mixnet::new(&MixnetConfig {
            replay_cache_capacity: 16,
            ..Default::default()
        })
        .unwrap();

        for i in 0..400 {
            net.send(&format!("message {i}"), DEFAULT_DESTINATION).unwrap();
        }

        let registry = net.registry();
        assert_eq!(registry.processed_total(), 400 * 5);
        assert!(registry.replay_cache_total() <= 10 * 16);
        for id in registry.node_ids() {
            assert!(registry.node(id).unwrap().replay_cache_len() <= 16);
        }
    }

    #[tokio::test]
    async fn test_send_with_timeout_delivers() {
        let net = mixnet(10, 5);
        let delivery = net
            .send_with_timeout("hello", DEFAULT_DESTINATION, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(delivery.message, "hello");
        assert_eq!(delivery.hops, 5);
    }

    #[tokio::test]
    async fn test_expired_deadline_times_out() {
        let net = mixnet(10, 5);

        assert_eq!(
            net.send_with_timeout("hello", DEFAULT_DESTINATION, Duration::ZERO)
                .await
                .unwrap_err(),
            MixError::Timeout(Duration::ZERO)
        );
    }

    #[tokio::test]
    async fn test_timed_send_reports_selection_errors() {
        let net = mixnet(2, 3);

        assert!(matches!(
            net.send_with_timeout("hello", "d", Duration::from_secs(1)).await,
            Err(MixError::InsufficientNodes { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sends_share_registry() {
        let net = Arc::new(mixnet(10, 5));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let net = Arc::clone(&net);
                tokio::spawn(async move {
                    net.send_with_timeout(&format!("msg {i}"), "d", Duration::from_secs(5))
                        .await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let delivery = handle.await.unwrap().unwrap();
            assert_eq!(delivery.message, format!("msg {i}"));
        }
        assert_eq!(net.registry().processed_total(), 40);
    }
}
