// Server loop module
// Accepts connections until shutdown, then waits for in-flight requests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How often the drain loop re-checks the active connection count
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept loop.
///
/// Runs until `shutdown` is notified, then stops accepting and gives active
/// connections up to `drain_timeout` to finish.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
    drain_timeout: Duration,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_info("[SHUTDOWN] Stopped accepting new connections");
                break;
            }
        }
    }

    drop(listener);
    wait_for_drain(&active_connections, drain_timeout).await;
}

/// Wait until no connection is active or the timeout elapses
async fn wait_for_drain(active_connections: &AtomicUsize, drain_timeout: Duration) {
    let deadline = tokio::time::Instant::now() + drain_timeout;

    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            logger::log_info("[SHUTDOWN] All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown drain timed out with {active} connection(s) still active"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::test_state;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let counter = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        wait_for_drain(&counter, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let counter = AtomicUsize::new(1);
        let started = tokio::time::Instant::now();
        wait_for_drain(&counter, Duration::from_millis(120)).await;
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_serves_request_then_shuts_down() {
        let (_dir, state) = test_state().await;
        let state = Arc::new(state);
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&counter),
            Arc::clone(&shutdown),
            Duration::from_secs(2),
        ));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        client.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "got: {raw}");
        assert!(raw.contains(r#"{"status":"ok"}"#));

        shutdown.notify_one();
        server.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
