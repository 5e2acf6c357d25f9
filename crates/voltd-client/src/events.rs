//! Tap event notifications
//!
//! The event connection is push-only: the daemon writes bare
//! `single`/`double`/`long` tokens whenever the button is tapped. A
//! background task owns that connection exclusively and dispatches each
//! notification through the handler registry.
//!
//! Unlike the command connection's bounded retry, the listener loop is
//! deliberately unbounded: every read error is a diagnostic followed by a
//! one second pause, and the loop only ends when the client shuts it down.

use crate::config::BoxedConn;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use voltd_protocol::TapEvent;

/// Pause after an event-connection read error before retrying
const ERROR_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single event read
const READ_CHUNK_SIZE: usize = 4096;

/// A tap notification callback
pub type TapHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Per-kind ordered handler lists
///
/// Registration happens on the caller's task, dispatch on the listener's;
/// the registry lock keeps the two from corrupting each other. There is no
/// removal operation.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: Mutex<HashMap<TapEvent, Vec<TapHandler>>>,
}

impl HandlerRegistry {
    /// Append a handler to the list for `kind`
    pub(crate) fn register(&self, kind: TapEvent, handler: TapHandler) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.entry(kind).or_default().push(handler);
    }

    /// Invoke every handler for `kind`, in registration order
    ///
    /// Each handler runs isolated: one panicking handler is reported and the
    /// rest still run.
    pub(crate) fn dispatch(&self, kind: TapEvent) {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = handlers.get(&kind) else {
            return;
        };
        for (index, handler) in list.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(handler)).is_err() {
                warn!(%kind, index, "tap handler panicked");
            }
        }
    }
}

/// Background task owning the event connection
pub(crate) struct EventListener {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl EventListener {
    /// Start listening; the task runs until [`EventListener::stop`]
    pub(crate) fn spawn(conn: BoxedConn, registry: std::sync::Arc<HandlerRegistry>) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_events(conn, registry, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the loop, close the event connection and join the task
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                debug!("event listener join failed: {}", e);
            }
        }
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        // A dropped-but-not-stopped client still signals the task to end;
        // join is only possible through the async stop path.
        self.cancel.cancel();
    }
}

async fn poll_events(
    mut conn: BoxedConn,
    registry: std::sync::Arc<HandlerRegistry>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => break,
            result = conn.read(&mut buf) => match result {
                Ok(0) => {
                    warn!("event connection closed by daemon");
                    wait_before_retry(&cancel).await;
                    continue;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("event connection read failed: {}", e);
                    wait_before_retry(&cancel).await;
                    continue;
                }
            },
        };

        match TapEvent::from_wire(&buf[..n]) {
            Some(kind) => {
                debug!(%kind, "tap event");
                registry.dispatch(kind);
            }
            None => {
                warn!(
                    "unrecognized event payload: {:?}",
                    String::from_utf8_lossy(&buf[..n])
                );
            }
        }
    }
    debug!("event listener stopped");
}

async fn wait_before_retry(cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = sleep(ERROR_RETRY_DELAY) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> TapHandler {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().push(label))
    }

    #[test]
    fn test_dispatch_runs_handlers_in_registration_order() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(TapEvent::Single, recorder(&log, "first"));
        registry.register(TapEvent::Single, recorder(&log, "second"));
        registry.register(TapEvent::Single, recorder(&log, "third"));
        registry.register(TapEvent::Double, recorder(&log, "other"));

        registry.dispatch(TapEvent::Single);

        assert_eq!(&*log.lock().unwrap(), &["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_without_handlers_is_a_noop() {
        let registry = HandlerRegistry::default();
        registry.dispatch(TapEvent::Long);
    }

    #[test]
    fn test_panicking_handler_does_not_suppress_later_handlers() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(TapEvent::Single, recorder(&log, "before"));
        registry.register(TapEvent::Single, Box::new(|| panic!("handler bug")));
        registry.register(TapEvent::Single, recorder(&log, "after"));

        registry.dispatch(TapEvent::Single);

        assert_eq!(&*log.lock().unwrap(), &["before", "after"]);
    }

    async fn wait_until(counter: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) == expected {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} dispatches, saw {}",
            expected,
            counter.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_listener_dispatches_tap_events() {
        let (mut daemon_side, client_side) = tokio::io::duplex(256);
        let registry = Arc::new(HandlerRegistry::default());
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            registry.register(
                TapEvent::Single,
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let listener = EventListener::spawn(Box::new(client_side), registry);

        daemon_side.write_all(b"single").await.unwrap();
        wait_until(&count, 1).await;

        daemon_side.write_all(b"single").await.unwrap();
        wait_until(&count, 2).await;

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_unrecognized_payload_keeps_listener_alive() {
        let (mut daemon_side, client_side) = tokio::io::duplex(256);
        let registry = Arc::new(HandlerRegistry::default());
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            registry.register(
                TapEvent::Single,
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let listener = EventListener::spawn(Box::new(client_side), registry);

        daemon_side.write_all(b"triple").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // A valid notification after the garbage still dispatches
        daemon_side.write_all(b"single").await.unwrap();
        wait_until(&count, 1).await;

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_stop_joins_with_read_in_flight() {
        let (_daemon_side, client_side) = tokio::io::duplex(256);
        let registry = Arc::new(HandlerRegistry::default());
        let listener = EventListener::spawn(Box::new(client_side), registry);

        // No data ever arrives; stop must still unblock and join promptly
        tokio::time::timeout(Duration::from_secs(1), listener.stop())
            .await
            .expect("listener did not stop");
    }
}
