//! Reserved `Reply.status` codes.
//!
//! Negative values are protocol signals understood by the broker itself; zero is success;
//! positive values are opaque application errors that the broker only ever passes through.

/// Registration ping sent by a service while it waits for the broker to learn its identity.
/// Never forwarded to a requester.
pub const HELLO: i64 = -1;

/// The broker could not find a service registered under the requested `dst`.
pub const SERVICE_UNKNOWN: i64 = -2;

/// A request was rejected before it reached a service because it failed basic validity checks
/// (missing `dst`, or a `message_type` other than `RequestValue`/`WriteValue` arriving on the
/// request plane).
pub const MESSAGE_ERROR: i64 = -3;

/// Success.
pub const OK: i64 = 0;
