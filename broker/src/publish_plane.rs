use tracing::{info, info_span, warn};

use crate::error::BrokerError;
use crate::shutdown::ShutdownSignal;

/// No state is retained between messages: every ingress frame set is forwarded byte-for-byte
/// to the egress socket, which applies topic-prefix filtering itself.
pub struct PublishPlane {
    ingress: zmq::Socket,
    egress: zmq::Socket,
    poll_interval_ms: i64,
    shutdown: ShutdownSignal,
}

impl PublishPlane {
    pub fn bind(
        ctx: &zmq::Context,
        submit_values_address: &str,
        new_values_address: &str,
        poll_interval_ms: u64,
        shutdown: ShutdownSignal,
    ) -> Result<Self, BrokerError> {
        let ingress = ctx.socket(zmq::PULL)?;
        ingress.bind(submit_values_address)?;
        let egress = ctx.socket(zmq::PUB)?;
        egress.bind(new_values_address)?;
        Ok(Self {
            ingress,
            egress,
            poll_interval_ms: poll_interval_ms as i64,
            shutdown,
        })
    }

    pub fn run(mut self) {
        let span = info_span!("publish_plane");
        let _enter = span.enter();
        info!("publish plane started");

        loop {
            if let Err(error) = self.poll_once() {
                warn!(%error, "publish plane tick failed");
            }
            if self.shutdown.is_triggered() {
                break;
            }
        }

        info!("publish plane stopped");
    }

    fn poll_once(&mut self) -> Result<(), BrokerError> {
        let mut items = [self.ingress.as_poll_item(zmq::POLLIN)];
        zmq::poll(&mut items, self.poll_interval_ms)?;

        if items[0].is_readable() {
            let frames = self.ingress.recv_multipart(0)?;
            if frames.len() != 2 {
                warn!(frame_count = frames.len(), "dropping publish message, expected [topic, body]");
                return Ok(());
            }
            self.egress.send_multipart(frames, 0)?;
        }
        Ok(())
    }
}
