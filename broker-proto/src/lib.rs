// Copyright 2026 The Rendezvous Broker Contributors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Wire message types and the router-envelope framing used on every broker socket.

mod envelope;
mod error;
mod message;
pub mod status;
mod time;

pub use envelope::{build_router_envelope, split_router_envelope};
pub use error::CodecError;
pub use message::{Message, MessageType};
pub use time::epoch_now;

/// The broker's fixed identity on the service-plane `ROUTER` socket. Peers address replies and
/// `HELLO` pings here; it never changes across broker restarts.
pub const BROKER_IDENTITY: &[u8] = b"BROKER";

/// [`BROKER_IDENTITY`] as it appears in the `from` field of messages the broker itself originates
/// (the `HELLO` ack and the synthesized `SERVICE_UNKNOWN` reply).
pub const BROKER_NAME: &str = "BROKER";
