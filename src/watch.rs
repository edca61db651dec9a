use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{EventKind, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Call `render` once, then again after every debounced change under `input`.
///
/// Render failures (for example a half-written export) are logged and the
/// loop keeps waiting for the next change.
pub fn run<F>(input: &Path, interval: u64, mut render: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let interval = Duration::from_secs(interval);

    redraw(&mut render)?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                    let _ = tx.send(());
                }
                _ => {}
            }
        }
    })?;
    watcher.watch(input, RecursiveMode::Recursive)?;
    debug!(path = %input.display(), "watching for changes");

    // Event loop with debounce
    while let Ok(()) = rx.recv() {
        let deadline = Instant::now() + interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(()) => continue,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }

        if let Err(e) = redraw(&mut render) {
            warn!(error = %e, "refresh failed");
        }
    }

    Ok(())
}

fn redraw<F>(render: &mut F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    // Clear screen and move cursor to top-left
    print!("\x1b[2J\x1b[H");
    std::io::stdout().flush()?;
    render()
}
