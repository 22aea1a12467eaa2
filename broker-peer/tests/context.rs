//! Exercises `PeerContext` against hand-rolled stand-ins for the broker's sockets, over TCP
//! loopback (inproc:// requires sharing a `zmq::Context`, which `PeerContext::connect` does not
//! expose, so loopback is the simplest way to test a peer in isolation).

use std::thread;
use std::time::Duration;

use broker_peer::{PeerConfig, PeerContext};
use broker_proto::status;

fn bind_wildcard(ctx: &zmq::Context, socket_type: zmq::SocketType) -> (zmq::Socket, String) {
    let socket = ctx.socket(socket_type).unwrap();
    socket.bind("tcp://127.0.0.1:*").unwrap();
    let endpoint = socket.get_last_endpoint().unwrap().unwrap();
    (socket, endpoint)
}

fn unroutable_config(name: &str) -> PeerConfig {
    PeerConfig {
        name: name.to_string(),
        request_address: "tcp://127.0.0.1:1".to_string(),
        service_address: "tcp://127.0.0.1:1".to_string(),
        submit_values_address: "tcp://127.0.0.1:1".to_string(),
        new_values_address: "tcp://127.0.0.1:1".to_string(),
    }
}

#[test]
fn request_value_sends_and_awaits_exactly_one_reply() {
    let broker_ctx = zmq::Context::new();
    let (router, endpoint) = bind_wildcard(&broker_ctx, zmq::ROUTER);

    let responder = thread::spawn(move || {
        let frames = router.recv_multipart(0).unwrap();
        let (identity, message) = broker_proto::split_router_envelope(frames).unwrap();
        assert_eq!(message.from, "app");
        assert_eq!(message.dst.as_deref(), Some("cfg"));

        let reply = broker_proto::Message::reply("cfg", "app", status::OK, 1.0, Some(serde_json::json!({"k": 1})));
        let envelope = broker_proto::build_router_envelope(identity, &reply);
        router.send_multipart(envelope, 0).unwrap();
    });

    let mut config = unroutable_config("app");
    config.request_address = endpoint;
    let peer = PeerContext::connect(&config).unwrap();

    let reply = peer
        .request_value("cfg", Some(serde_json::json!({"op": "read"})))
        .unwrap();
    assert_eq!(reply.status, Some(status::OK));
    assert_eq!(reply.payload, Some(serde_json::json!({"k": 1})));

    responder.join().unwrap();
}

#[test]
fn make_source_known_retries_until_a_reply_arrives() {
    let broker_ctx = zmq::Context::new();
    let (router, endpoint) = bind_wildcard(&broker_ctx, zmq::ROUTER);

    let responder = thread::spawn(move || {
        // Simulate the broker's ROUTER dropping the first ping or two before it "learns" the
        // peer's identity, then finally answering.
        for _ in 0..3 {
            let mut items = [router.as_poll_item(zmq::POLLIN)];
            if zmq::poll(&mut items, 50).unwrap() > 0 {
                let frames = router.recv_multipart(0).unwrap();
                let (identity, message) = broker_proto::split_router_envelope(frames).unwrap();
                assert_eq!(message.status, Some(status::HELLO));
                let ack = broker_proto::Message::reply("BROKER", &message.from, status::HELLO, 0.0, None);
                let envelope = broker_proto::build_router_envelope(identity, &ack);
                router.send_multipart(envelope, 0).unwrap();
                return;
            }
        }
        panic!("never received a HELLO ping");
    });

    let mut config = unroutable_config("cfg");
    config.service_address = endpoint;
    let peer = PeerContext::connect(&config).unwrap();

    peer.make_source_known().unwrap();
    responder.join().unwrap();
}

#[test]
fn publish_emits_two_frame_topic_body_shape() {
    let broker_ctx = zmq::Context::new();
    let (pull, endpoint) = bind_wildcard(&broker_ctx, zmq::PULL);

    let mut config = unroutable_config("sensor");
    config.submit_values_address = endpoint;
    let peer = PeerContext::connect(&config).unwrap();

    // Give the PUSH/PULL connection a moment to complete before publishing.
    thread::sleep(Duration::from_millis(50));
    peer.publish(Some(serde_json::json!(5))).unwrap();

    let frames = pull.recv_multipart(0).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], b"sensor");
    let body = broker_proto::Message::decode(&frames[1]).unwrap();
    assert_eq!(body.from, "sensor");
    assert_eq!(body.payload, Some(serde_json::json!(5)));
}
