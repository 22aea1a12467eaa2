pub use broker_proto::epoch_now;
