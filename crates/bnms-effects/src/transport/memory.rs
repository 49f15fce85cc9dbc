//! In-Memory Transport Handler
//!
//! Endpoints registered on one [`InMemoryNetwork`] exchange encoded frames.
//! Every frame goes through the wire codec so the same bytes a socket
//! transport would carry are produced and parsed here.
//!
//! Routing at the receiving side:
//! - `Response` frames complete the pending request with the same
//!   correlation id (late replies are dropped);
//! - `Request` and `Delta` frames are forwarded to the endpoint's inbox.

use async_trait::async_trait;
use bnms_core::effects::TransportEffects;
use bnms_core::messages::{
    codec, Envelope, Inbound, MembershipDelta, MembershipRequest, MembershipResponse, WirePayload,
};
use bnms_core::{Party, TransportError, TransportResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

type PendingReplies = Arc<Mutex<HashMap<Uuid, oneshot::Sender<MembershipResponse>>>>;

/// Receiving side of one registered party.
#[derive(Debug)]
struct Route {
    inbox: mpsc::UnboundedSender<Inbound>,
    pending: PendingReplies,
}

impl Route {
    fn deliver(&self, frame: &[u8]) -> TransportResult<()> {
        let envelope = codec::decode(frame)?;
        match envelope.payload {
            WirePayload::Response(response) => {
                match self.pending.lock().remove(&envelope.correlation_id) {
                    Some(waiter) => {
                        // The requester may have timed out and dropped its receiver.
                        let _ = waiter.send(response);
                    }
                    None => tracing::debug!(
                        correlation_id = %envelope.correlation_id,
                        from = %envelope.from,
                        "dropping reply with no pending request"
                    ),
                }
                Ok(())
            }
            WirePayload::Request(request) => self
                .inbox
                .send(Inbound::Request {
                    from: envelope.from,
                    correlation_id: envelope.correlation_id,
                    request,
                })
                .map_err(|_| TransportError::Unreachable { peer: envelope.to }),
            WirePayload::Delta(delta) => self
                .inbox
                .send(Inbound::Delta {
                    from: envelope.from,
                    delta,
                })
                .map_err(|_| TransportError::Unreachable { peer: envelope.to }),
        }
    }
}

// =============================================================================
// Network
// =============================================================================

/// Shared registry of in-process endpoints. Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNetwork {
    routes: Arc<RwLock<HashMap<Party, Route>>>,
}

impl InMemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `party` to the network.
    ///
    /// Returns the endpoint used for sending and the inbox on which requests
    /// and deltas addressed to `party` arrive. Registering the same party
    /// again replaces its previous route.
    pub fn register(&self, party: Party) -> (Arc<InMemoryEndpoint>, mpsc::UnboundedReceiver<Inbound>) {
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        self.routes.write().insert(
            party.clone(),
            Route {
                inbox,
                pending: pending.clone(),
            },
        );
        tracing::debug!(party = %party, "endpoint registered");

        let endpoint = InMemoryEndpoint {
            local: party,
            network: self.clone(),
            pending,
        };
        (Arc::new(endpoint), inbox_rx)
    }

    /// Detach `party`; frames addressed to it fail as unreachable.
    pub fn disconnect(&self, party: &Party) {
        if self.routes.write().remove(party).is_some() {
            tracing::debug!(party = %party, "endpoint disconnected");
        }
    }

    /// Whether `party` currently has a route
    pub fn is_connected(&self, party: &Party) -> bool {
        self.routes.read().contains_key(party)
    }

    fn send(&self, envelope: &Envelope) -> TransportResult<()> {
        let frame = codec::encode(envelope)?;
        let routes = self.routes.read();
        let route = routes
            .get(&envelope.to)
            .ok_or_else(|| TransportError::Unreachable {
                peer: envelope.to.clone(),
            })?;
        route.deliver(&frame)
    }
}

// =============================================================================
// Endpoint
// =============================================================================

/// Sending half of a party attached to an [`InMemoryNetwork`].
#[derive(Debug)]
pub struct InMemoryEndpoint {
    local: Party,
    network: InMemoryNetwork,
    pending: PendingReplies,
}

impl InMemoryEndpoint {
    fn envelope(&self, to: &Party, correlation_id: Uuid, payload: WirePayload) -> Envelope {
        Envelope {
            from: self.local.clone(),
            to: to.clone(),
            correlation_id,
            payload,
        }
    }

    /// Number of requests still awaiting a reply
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl TransportEffects for InMemoryEndpoint {
    fn local_party(&self) -> &Party {
        &self.local
    }

    async fn request(
        &self,
        to: &Party,
        request: MembershipRequest,
        timeout: Duration,
    ) -> TransportResult<MembershipResponse> {
        let correlation_id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().insert(correlation_id, reply_tx);

        let envelope = self.envelope(to, correlation_id, WirePayload::Request(request));
        if let Err(err) = self.network.send(&envelope) {
            self.pending.lock().remove(&correlation_id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::ChannelClosed),
            Err(_) => {
                self.pending.lock().remove(&correlation_id);
                Err(TransportError::Timeout {
                    peer: to.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn respond(
        &self,
        to: &Party,
        correlation_id: Uuid,
        response: MembershipResponse,
    ) -> TransportResult<()> {
        let envelope = self.envelope(to, correlation_id, WirePayload::Response(response));
        self.network.send(&envelope)
    }

    async fn push_delta(&self, to: &Party, delta: MembershipDelta) -> TransportResult<()> {
        let envelope = self.envelope(to, Uuid::new_v4(), WirePayload::Delta(delta));
        self.network.send(&envelope)
    }
}
