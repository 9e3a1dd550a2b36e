//! Startup readiness: wait until a server listens behind a TCP port.
//!
//! A published container port is fronted by the engine's port proxy, which
//! accepts every connection and closes it again when nothing listens inside
//! the container. A completed connect therefore proves nothing on its own:
//! the connection must also stay open for [`SETTLE_WINDOW`].

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Delay between connection attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

/// How long an accepted connection must survive before the port counts as
/// served.
pub const SETTLE_WINDOW: Duration = Duration::from_millis(300);

/// Connect to `addr` repeatedly until a connection is accepted and held
/// open, or `timeout` elapses. Returns the time it took for the server to
/// come up.
pub async fn wait_for_port(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<Duration, ReadinessError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts: u32 = 0;
    let mut last_error: Option<String> = None;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(ReadinessError::Timeout {
                addr,
                timeout,
                attempts,
                last_error,
            });
        }

        attempts += 1;
        match tokio::time::timeout(deadline - now, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                let window = SETTLE_WINDOW.min(deadline.saturating_duration_since(Instant::now()));
                match settle(&mut stream, window).await {
                    Ok(()) => {
                        let elapsed = started.elapsed();
                        tracing::debug!(%addr, attempts, ?elapsed, "port served");
                        return Ok(elapsed);
                    }
                    Err(reason) => {
                        tracing::trace!(%addr, attempts, %reason, "connection dropped");
                        last_error = Some(reason);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::trace!(%addr, attempts, error = %e, "port not ready");
                last_error = Some(e.to_string());
            }
            // Deadline hit mid-connect; the next iteration reports it.
            Err(elapsed) => {
                last_error = Some(elapsed.to_string());
                continue;
            }
        }

        tokio::time::sleep(interval.min(deadline.saturating_duration_since(Instant::now())))
            .await;
    }
}

/// Hold an accepted connection for `window`.
///
/// A server that stays silent (HTTP waits for the request) or sends a
/// greeting is up. End-of-stream or a reset means the peer closed the
/// connection, which is what a proxy without a backend does.
async fn settle(stream: &mut TcpStream, window: Duration) -> Result<(), String> {
    if window.is_zero() {
        return Err("deadline reached before the connection settled".to_owned());
    }
    let mut buf = [0u8; 1];
    match tokio::time::timeout(window, stream.read(&mut buf)).await {
        Ok(Ok(0)) => Err("connection closed by peer".to_owned()),
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(elapsed) => {
            tracing::trace!(%elapsed, "connection held open");
            Ok(())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error(
        "{addr} was not served within {timeout:?} ({attempts} attempts){}",
        error_suffix(.last_error)
    )]
    Timeout {
        addr: SocketAddr,
        timeout: Duration,
        attempts: u32,
        last_error: Option<String>,
    },
}

fn error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(": {e}"),
        None => String::new(),
    }
}
