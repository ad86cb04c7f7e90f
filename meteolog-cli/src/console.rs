use std::io::{self, BufRead};
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards stdin lines into a channel from a dedicated thread.
///
/// The thread is detached: it may stay parked in `read_line` after the menu
/// has stopped, and dies with the process.
pub fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(1);

    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read from stdin");
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}
