use broker_proto::Message;
use tracing::debug;

use crate::error::BrokerError;

/// Well-known rendezvous point for the in-process channel between the request and service
/// planes. Either plane may start first; whichever calls [`InterplaneChannel::open`] first binds,
/// the other observes `EADDRINUSE` and connects instead.
const INTERPLANE_ADDRESS: &str = "inproc://rendezvous-broker/interplane";

/// One endpoint of the `PAIR` socket linking the request and service planes. Carries a single [`Message`] per frame;
/// there is no framing concern here because `PAIR` sockets are strictly one-to-one.
pub struct InterplaneChannel {
    socket: zmq::Socket,
}

impl InterplaneChannel {
    pub fn open(ctx: &zmq::Context) -> Result<Self, BrokerError> {
        let socket = ctx.socket(zmq::PAIR)?;
        match socket.bind(INTERPLANE_ADDRESS) {
            Ok(()) => {
                debug!(address = INTERPLANE_ADDRESS, "bound inter-plane channel");
                Ok(Self { socket })
            },
            Err(zmq::Error::EADDRINUSE) => {
                socket.connect(INTERPLANE_ADDRESS)?;
                debug!(address = INTERPLANE_ADDRESS, "connected to inter-plane channel");
                Ok(Self { socket })
            },
            Err(other) => Err(other.into()),
        }
    }

    pub fn send(&self, message: &Message) -> Result<(), BrokerError> {
        self.socket.send(message.encode(), zmq::DONTWAIT)?;
        Ok(())
    }

    pub fn recv(&self) -> Result<Message, BrokerError> {
        let raw = self.socket.recv_bytes(0)?;
        Ok(Message::decode(&raw)?)
    }

    pub fn as_poll_item(&self) -> zmq::PollItem {
        self.socket.as_poll_item(zmq::POLLIN | zmq::POLLOUT)
    }
}
