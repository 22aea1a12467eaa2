use std::cell::RefCell;
use std::collections::HashSet;

use broker_proto::{status, Message};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::PeerConfig;
use crate::error::PeerError;
use crate::time::epoch_now;

/// How often `make_source_known` retries the `HELLO` ping while waiting for the broker's
/// service-plane `ROUTER` socket to learn this peer's identity.
const HELLO_RETRY_INTERVAL_MS: i64 = 10;

/// Per-service facade over the broker's four endpoints.
///
/// Every socket here is owned exclusively by this `PeerContext` and must not be touched from
/// another thread concurrently — the same hard rule the broker's own planes follow.
pub struct PeerContext {
    name: String,
    _zmq_context: zmq::Context,
    requests: zmq::Socket,
    services: zmq::Socket,
    submit_values: zmq::Socket,
    new_values: zmq::Socket,
    subscriptions: RefCell<HashSet<String>>,
}

impl PeerContext {
    /// Open all four connections to the broker: request, service, publish-ingress, subscribe.
    pub fn connect(config: &PeerConfig) -> Result<Self, PeerError> {
        let zmq_context = zmq::Context::new();

        let requests = zmq_context.socket(zmq::REQ)?;
        requests.connect(&config.request_address)?;

        let services = zmq_context.socket(zmq::ROUTER)?;
        services.connect(&config.service_address)?;

        let submit_values = zmq_context.socket(zmq::PUSH)?;
        submit_values.connect(&config.submit_values_address)?;

        let new_values = zmq_context.socket(zmq::SUB)?;
        new_values.connect(&config.new_values_address)?;

        Ok(Self {
            name: config.name.clone(),
            _zmq_context: zmq_context,
            requests,
            services,
            submit_values,
            new_values,
            subscriptions: RefCell::new(HashSet::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget publication: `[topic=self.name, encoded_body]` on the publish-ingress
    /// socket. Never blocks on a reply.
    pub fn publish(&self, payload: Option<Value>) -> Result<(), PeerError> {
        let message = Message::publication(self.name.clone(), epoch_now(), payload);
        let encoded = message.encode();
        self.submit_values
            .send_multipart(vec![self.name.as_bytes(), encoded.as_slice()], 0)?;
        Ok(())
    }

    /// Send a `RequestValue` and block for exactly one reply (the `REQ` socket enforces the
    /// strict send/recv alternation this requires).
    pub fn request_value(&self, dst: &str, payload: Option<Value>) -> Result<Message, PeerError> {
        let request = Message::request_value(self.name.clone(), dst, payload);
        self.requests.send(request.encode(), 0)?;
        let raw = self.requests.recv_bytes(0)?;
        Ok(Message::decode(&raw)?)
    }

    /// Same shape as `request_value` with `WriteValue`.
    pub fn write_value(&self, dst: &str, payload: Value) -> Result<Message, PeerError> {
        let request = Message::write_value(self.name.clone(), dst, payload);
        self.requests.send(request.encode(), 0)?;
        let raw = self.requests.recv_bytes(0)?;
        Ok(Message::decode(&raw)?)
    }

    /// Block for an inbound request forwarded by the broker's service plane. The transport
    /// identity is never exposed to the caller — only the decoded body.
    pub fn recv_request(&self) -> Result<Message, PeerError> {
        let frames = self.services.recv_multipart(0)?;
        let (_identity, message) = broker_proto::split_router_envelope(frames)?;
        Ok(message)
    }

    /// Reply to an inbound request, addressed back through the broker's fixed service identity.
    pub fn send_reply(&self, dst: &str, payload: Option<Value>) -> Result<(), PeerError> {
        self.send_reply_with_status(dst, payload, status::OK)
    }

    pub fn send_reply_with_status(&self, dst: &str, payload: Option<Value>, status: i64) -> Result<(), PeerError> {
        let reply = Message::reply(self.name.clone(), dst, status, epoch_now(), payload);
        let encoded = reply.encode();
        self.services
            .send_multipart(vec![broker_proto::BROKER_IDENTITY, b"", encoded.as_slice()], 0)?;
        Ok(())
    }

    /// Block for the next value update whose topic this peer is subscribed to.
    pub fn recv_update(&self) -> Result<Message, PeerError> {
        let frames = self.new_values.recv_multipart(0)?;
        // frame 0 is the topic, already used by the transport to filter; the rest is the body.
        Ok(Message::decode_frames(&frames[1..])?)
    }

    pub fn set_subscriptions<S: AsRef<str>>(&self, names: &[S]) -> Result<(), PeerError> {
        let mut subscriptions = self.subscriptions.borrow_mut();
        for name in names {
            self.new_values.set_subscribe(name.as_ref().as_bytes())?;
            subscriptions.insert(name.as_ref().to_string());
        }
        Ok(())
    }

    pub fn remove_subscriptions<S: AsRef<str>>(&self, names: &[S]) -> Result<(), PeerError> {
        let mut subscriptions = self.subscriptions.borrow_mut();
        for name in names {
            self.new_values.set_unsubscribe(name.as_ref().as_bytes())?;
            subscriptions.remove(name.as_ref());
        }
        Ok(())
    }

    pub fn subscriptions(&self) -> HashSet<String> {
        self.subscriptions.borrow().clone()
    }

    /// The registration handshake. The broker's service-plane `ROUTER` silently drops outbound
    /// frames addressed to an identity it has not yet received from, so the first `HELLO` may be
    /// lost; retry until the round trip completes once.
    pub fn make_source_known(&self) -> Result<(), PeerError> {
        loop {
            self.send_reply_with_status("NONE", None, status::HELLO)?;
            trace!(peer = %self.name, "sent HELLO, polling for registration reply");

            let mut items = [self.services.as_poll_item(zmq::POLLIN)];
            let ready = zmq::poll(&mut items, HELLO_RETRY_INTERVAL_MS)?;
            if ready > 0 && items[0].is_readable() {
                self.services.recv_multipart(0)?;
                debug!(peer = %self.name, "registration handshake complete");
                return Ok(());
            }
        }
    }
}
