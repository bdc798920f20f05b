use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Two consecutive polls saw the same size.
    Stable { size: u64 },
    /// The timeout elapsed first; the file may still be growing or missing.
    TimedOut,
}

/// Poll a file's size every `interval` until two consecutive reads agree or
/// `timeout` elapses. A temporarily missing file keeps the wait going.
pub async fn wait_for_stable(path: &Path, timeout: Duration, interval: Duration) -> Stability {
    let deadline = Instant::now() + timeout;
    let mut previous: Option<u64> = None;
    loop {
        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                let size = meta.len();
                if previous == Some(size) {
                    debug!(path = %path.display(), size, "file is stable");
                    return Stability::Stable { size };
                }
                previous = Some(size);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "file not present yet");
                previous = None;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stat failed");
                previous = None;
            }
        }
        if Instant::now() + interval > deadline {
            warn!(path = %path.display(), timeout_ms = timeout.as_millis(), "file did not settle before timeout");
            return Stability::TimedOut;
        }
        tokio::time::sleep(interval).await;
    }
}
