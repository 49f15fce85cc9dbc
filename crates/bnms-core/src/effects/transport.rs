//! Transport interface
//!
//! An endpoint is bound to one local party. Requests and pushed deltas leave
//! through the trait; inbound traffic arrives as [`Inbound`] values on the
//! receiver handed out when the endpoint was created. The sender of every
//! inbound message is stamped by the transport, never taken from the payload.
//!
//! [`Inbound`]: crate::messages::Inbound

use crate::errors::TransportResult;
use crate::identifiers::Party;
use crate::messages::{MembershipDelta, MembershipRequest, MembershipResponse};
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Message delivery bound to a local party.
#[async_trait]
pub trait TransportEffects: Send + Sync {
    /// Party this endpoint speaks for
    fn local_party(&self) -> &Party;

    /// Send a request and wait for the correlated reply.
    ///
    /// Suspends until the reply arrives or `timeout` elapses.
    async fn request(
        &self,
        to: &Party,
        request: MembershipRequest,
        timeout: Duration,
    ) -> TransportResult<MembershipResponse>;

    /// Answer a request previously received as `Inbound::Request`.
    async fn respond(
        &self,
        to: &Party,
        correlation_id: Uuid,
        response: MembershipResponse,
    ) -> TransportResult<()>;

    /// Deliver an unsolicited delta. No reply is expected.
    async fn push_delta(&self, to: &Party, delta: MembershipDelta) -> TransportResult<()>;
}
