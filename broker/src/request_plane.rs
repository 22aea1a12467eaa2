use broker_proto::{split_router_envelope, status, Message, MessageType};
use tracing::{debug, info, info_span, warn};

use crate::error::BrokerError;
use crate::interplane::InterplaneChannel;
use crate::registry::IdentityTable;
use crate::shutdown::ShutdownSignal;

/// Owns the router socket bound to `request_address` and the pending-request table; forwards
/// accepted requests to the service plane and routes matching replies back by remembered
/// identity.
pub struct RequestPlane {
    router: zmq::Socket,
    interplane: InterplaneChannel,
    poll_interval_ms: i64,
    shutdown: ShutdownSignal,
    pending: IdentityTable,
}

impl RequestPlane {
    pub fn bind(
        ctx: &zmq::Context,
        request_address: &str,
        poll_interval_ms: u64,
        shutdown: ShutdownSignal,
    ) -> Result<Self, BrokerError> {
        let router = ctx.socket(zmq::ROUTER)?;
        router.bind(request_address)?;
        let interplane = InterplaneChannel::open(ctx)?;
        Ok(Self {
            router,
            interplane,
            poll_interval_ms: poll_interval_ms as i64,
            shutdown,
            pending: IdentityTable::new(),
        })
    }

    pub fn run(mut self) {
        let span = info_span!("request_plane");
        let _enter = span.enter();
        info!("request plane started");

        loop {
            if let Err(error) = self.poll_once() {
                warn!(%error, "request plane tick failed");
            }
            if self.shutdown.is_triggered() {
                break;
            }
        }

        info!("request plane stopped");
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

        // An inbound request is only consumed once both of its possible destinations — the
        // service plane (forwarded requests) and the router itself (a direct MESSAGE_ERROR
        // reply) — can take a send without blocking, mirroring `can_pass_to_router` /
        // `can_pass_to_other` in the grounding source.
        if router_readable && interplane_writable && router_writable {
            self.handle_inbound_request()?;
        }
        if interplane_readable && router_writable {
            self.handle_service_plane_reply()?;
        }
        Ok(())
    }

    fn handle_inbound_request(&mut self) -> Result<(), BrokerError> {
        let frames = self.router.recv_multipart(0)?;
        let (identity, body) = match split_router_envelope(frames) {
            Ok(parsed) => parsed,
            Err(error) => {
                // A malformed envelope is dropped without disturbing the pending table.
                warn!(%error, "dropping malformed request envelope");
                return Ok(());
            },
        };

        let valid_type = matches!(body.message_type, Some(MessageType::RequestValue) | Some(MessageType::WriteValue));
        if body.dst.is_none() || !valid_type {
            warn!(from = %body.from, message_type = ?body.message_type, "rejecting request, replying with MESSAGE_ERROR");
            let rejection = Message::reply(
                broker_proto::BROKER_NAME,
                body.from.clone(),
                status::MESSAGE_ERROR,
                broker_proto::epoch_now(),
                None,
            );
            let envelope = broker_proto::build_router_envelope(identity, &rejection);
            self.router.send_multipart(envelope, zmq::DONTWAIT)?;
            return Ok(());
        }

        debug!(from = %body.from, dst = ?body.dst, "accepted request");
        self.pending.insert(body.from.clone(), identity);
        self.interplane.send(&body)?;
        Ok(())
    }

    fn handle_service_plane_reply(&mut self) -> Result<(), BrokerError> {
        let reply = self.interplane.recv()?;
        let Some(dst) = reply.dst.clone() else {
            warn!(from = %reply.from, "reply from service plane has no destination, dropping");
            return Ok(());
        };

        match self.pending.remove(&dst) {
            Some(identity) => {
                let envelope = broker_proto::build_router_envelope(identity, &reply);
                self.router.send_multipart(envelope, zmq::DONTWAIT)?;
                debug!(requester = %dst, "delivered reply");
            },
            None => {
                debug!(requester = %dst, "no pending request for reply, dropping");
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exercises the pending-table bookkeeping in isolation, without any sockets: a request
    /// stores an identity, the matching reply consumes it exactly once, and an unmatched reply is
    /// a no-op rather than a panic.
    #[test]
    fn pending_table_consumes_on_matching_reply_and_ignores_unknown_dst() {
        let mut pending = IdentityTable::new();
        pending.insert("app".to_string(), vec![b"I1".to_vec()]);

        let reply = Message::reply("cfg", "app", 0, 1.0, None);
        assert_eq!(pending.remove(reply.dst.as_deref().unwrap()), Some(vec![b"I1".to_vec()]));
        assert!(pending.remove("app").is_none());

        let stray = Message::reply("cfg", "ghost", 0, 1.0, None);
        assert!(pending.remove(stray.dst.as_deref().unwrap()).is_none());
    }
}
