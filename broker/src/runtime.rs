use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::publish_plane::PublishPlane;
use crate::request_plane::RequestPlane;
use crate::service_plane::ServicePlane;
use crate::shutdown::Shutdown;

const JOIN_POLL_INTERVAL_MS: u64 = 200;

struct PlaneHandle {
    name: &'static str,
    handle: thread::JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

/// A running broker: the three plane threads plus the shutdown writer that stops them. Returned
/// by [`start`] so a caller — the CLI binary, or a test driving real sockets — can decide when to
/// tear it down instead of blocking on Ctrl-C.
pub struct Broker {
    shutdown: Shutdown,
    handles: Vec<PlaneHandle>,
}

impl Broker {
    /// Set the termination flag and join every plane thread with a bounded wait per attempt,
    /// repeating until all have exited. Returns `Err(BrokerError::PlanePanicked)` naming the
    /// first plane whose thread panicked instead of returning normally.
    pub fn shutdown_and_join(self) -> Result<(), BrokerError> {
        self.shutdown.trigger();
        join_all(self.handles, &self.shutdown)
    }
}

/// Binds the four endpoints and starts the three plane threads, without the foreground wait.
/// Exposed separately from [`run`] so tests can drive the planes with real sockets without
/// going through Ctrl-C.
///
/// Binding happens on the calling thread before any plane thread is spawned, so a bind failure
/// (address already in use, say) is returned here as `Err` rather than only ever surfacing as a
/// log line from a thread that exited immediately.
pub fn start(config: &BrokerConfig) -> Result<Broker, BrokerError> {
    let ctx = zmq::Context::new();
    let shutdown = Shutdown::new();

    let request_plane = RequestPlane::bind(&ctx, &config.request_address, config.poll_interval_ms, shutdown.signal())?;
    let service_plane = ServicePlane::bind(&ctx, &config.service_address, config.poll_interval_ms, shutdown.signal())?;
    let publish_plane = PublishPlane::bind(
        &ctx,
        &config.submit_values_address,
        &config.new_values_address,
        config.poll_interval_ms,
        shutdown.signal(),
    )?;

    let handles = vec![
        spawn_plane("request_plane", move || request_plane.run()),
        spawn_plane("service_plane", move || service_plane.run()),
        spawn_plane("publish_plane", move || publish_plane.run()),
    ];

    Ok(Broker { shutdown, handles })
}

/// Binds the four endpoints, starts the three plane threads, waits for a termination signal
/// (Ctrl-C), then joins every plane with a bounded wait per attempt so a second interrupt can
/// abort the wait instead of hanging forever.
pub fn run(config: BrokerConfig) -> Result<(), BrokerError> {
    let broker = start(&config)?;
    broker.shutdown.wire_ctrlc()?;

    info!("broker runtime started, awaiting termination signal");
    let signal = broker.shutdown.signal();
    while !signal.is_triggered() {
        thread::sleep(Duration::from_millis(JOIN_POLL_INTERVAL_MS));
    }
    info!("termination signal observed, joining plane threads");

    broker.shutdown_and_join()?;
    info!("broker runtime stopped");
    Ok(())
}

fn spawn_plane<F>(name: &'static str, task: F) -> PlaneHandle
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            task();
            let _ = done_tx.send(());
        })
        .expect("failed to spawn plane thread");
    PlaneHandle { name, handle, done: done_rx }
}

/// A second interrupt during this wait (observed via `Shutdown::is_aborted`) stops waiting early
/// and leaves any still-running thread detached rather than blocking the process forever.
fn join_all(handles: Vec<PlaneHandle>, shutdown: &Shutdown) -> Result<(), BrokerError> {
    let mut first_panic = None;

    for plane in handles {
        loop {
            if shutdown.is_aborted() {
                info!(plane = plane.name, "shutdown aborted, not waiting for this plane to join");
                break;
            }
            match plane.done.recv_timeout(Duration::from_millis(JOIN_POLL_INTERVAL_MS)) {
                Ok(()) => {
                    if plane.handle.join().is_err() {
                        error!(plane = plane.name, "plane thread panicked");
                        first_panic.get_or_insert(BrokerError::PlanePanicked(plane.name));
                    }
                    info!(plane = plane.name, "plane joined");
                    break;
                },
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    // The sender is only ever dropped without sending if the task panicked
                    // before reaching the `done_tx.send` line.
                    if plane.handle.join().is_err() {
                        error!(plane = plane.name, "plane thread panicked");
                        first_panic.get_or_insert(BrokerError::PlanePanicked(plane.name));
                    }
                    break;
                },
            }
        }
    }

    match first_panic {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
