use broker_proto::{split_router_envelope, status, Message};
use tracing::{debug, info, info_span, warn};

use crate::error::BrokerError;
use crate::interplane::InterplaneChannel;
use crate::registry::IdentityTable;
use crate::shutdown::ShutdownSignal;

/// Symmetric to [`crate::request_plane::RequestPlane`]: owns the router socket bound to
/// `service_address` (advertising the fixed `BROKER_IDENTITY`) and the peer registry. Handles the
/// `HELLO` handshake and synthesizes `SERVICE_UNKNOWN` replies.
pub struct ServicePlane {
    router: zmq::Socket,
    interplane: InterplaneChannel,
    poll_interval_ms: i64,
    shutdown: ShutdownSignal,
    registry: IdentityTable,
}

impl ServicePlane {
    pub fn bind(
        ctx: &zmq::Context,
        service_address: &str,
        poll_interval_ms: u64,
        shutdown: ShutdownSignal,
    ) -> Result<Self, BrokerError> {
        let router = ctx.socket(zmq::ROUTER)?;
        router.set_identity(broker_proto::BROKER_IDENTITY)?;
        router.bind(service_address)?;
        let interplane = InterplaneChannel::open(ctx)?;
        Ok(Self {
            router,
            interplane,
            poll_interval_ms: poll_interval_ms as i64,
            shutdown,
            registry: IdentityTable::new(),
        })
    }

    pub fn run(mut self) {
        let span = info_span!("service_plane");
        let _enter = span.enter();
        info!("service plane started");

        loop {
            if let Err(error) = self.poll_once() {
                warn!(%error, "service plane tick failed");
            }
            if self.shutdown.is_triggered() {
                break;
            }
        }

        info!("service plane stopped");
    }

    fn poll_once(&mut self) -> Result<(), BrokerError> {
        let mut items = [
            self.router.as_poll_item(zmq::POLLIN | zmq::POLLOUT),
            self.interplane.as_poll_item(),
        ];
        zmq::poll(&mut items, self.poll_interval_ms)?;

        let router_readable = items[0].is_readable();
        let router_writable = items[0].is_writable();
        let interplane_readable = items[1].is_readable();
        let interplane_writable = items[1].is_writable();

        // Mirrors the request plane's gating: an inbound message is only consumed once both of
        // its possible destinations (the router, for a HELLO ack, or the inter-plane channel,
        // for a forwarded reply) can take a send without blocking.
        if router_readable && router_writable && interplane_writable {
            self.handle_service_side_inbound()?;
        }
        if interplane_readable && router_writable && interplane_writable {
            self.handle_request_plane_forward()?;
        }
        Ok(())
    }

    fn handle_service_side_inbound(&mut self) -> Result<(), BrokerError> {
        let frames = self.router.recv_multipart(0)?;
        let (identity, body) = match split_router_envelope(frames) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(%error, "dropping malformed service-plane envelope");
                return Ok(());
            },
        };

        // Learn-on-every-message: the most recent inbound frame is the only reliable pointer to
        // a service's live identity (a peer may reconnect and be reassigned a new one).
        self.registry.insert(body.from.clone(), identity.clone());

        if body.status == Some(status::HELLO) {
            let ack = Message::reply(
                broker_proto::BROKER_NAME,
                body.from.clone(),
                status::HELLO,
                broker_proto::epoch_now(),
                None,
            );
            let envelope = broker_proto::build_router_envelope(identity, &ack);
            self.router.send_multipart(envelope, zmq::DONTWAIT)?;
            debug!(peer = %body.from, "completed HELLO handshake");
            return Ok(());
        }

        debug!(from = %body.from, "forwarding reply to request plane");
        self.interplane.send(&body)?;
        Ok(())
    }

    fn handle_request_plane_forward(&mut self) -> Result<(), BrokerError> {
        let request = self.interplane.recv()?;
        let Some(dst) = request.dst.clone() else {
            warn!(from = %request.from, "request forwarded with no destination, dropping");
            return Ok(());
        };

        match self.registry.get(&dst) {
            Some(identity) => {
                let envelope = broker_proto::build_router_envelope(identity.clone(), &request);
                self.router.send_multipart(envelope, zmq::DONTWAIT)?;
                debug!(service = %dst, "dispatched request");
            },
            None => {
                let unknown = Message::reply(
                    broker_proto::BROKER_NAME,
                    request.from.clone(),
                    status::SERVICE_UNKNOWN,
                    broker_proto::epoch_now(),
                    None,
                );
                self.interplane.send(&unknown)?;
                debug!(service = %dst, requester = %request.from, "service unknown");
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_learns_the_latest_identity_on_every_message() {
        let mut registry = IdentityTable::new();
        registry.insert("cfg".to_string(), vec![b"I1".to_vec()]);
        assert_eq!(registry.get("cfg"), Some(&vec![b"I1".to_vec()]));
        registry.insert("cfg".to_string(), vec![b"I2".to_vec()]);
        assert_eq!(registry.get("cfg"), Some(&vec![b"I2".to_vec()]));
    }

    #[test]
    fn unknown_destination_has_no_registry_entry() {
        let registry = IdentityTable::new();
        assert!(registry.get("ghost").is_none());
    }
}
