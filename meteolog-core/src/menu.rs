//! Foreground operator menu.
//!
//! Lines arrive over a channel so that waiting for the operator never blocks
//! the poll task; the binary feeds the channel from standard input.

use std::{io, num::NonZeroUsize, path::PathBuf, sync::Arc};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    export::{ExportOutcome, SpreadsheetExporter},
    storage::SampleStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Export,
    Exit,
}

impl Command {
    /// `"1"` exports, `"0"` exits; surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Command::Export),
            "0" => Some(Command::Exit),
            _ => None,
        }
    }
}

/// Why the menu stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuExit {
    /// The operator chose exit.
    Operator,
    /// The input stream ended.
    InputClosed,
    /// Shutdown was requested from elsewhere.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("failed to write to the console")]
    Output(#[from] io::Error),
}

pub struct InteractiveLoop<W> {
    store: Arc<dyn SampleStore>,
    exporter: Arc<dyn SpreadsheetExporter>,
    input: mpsc::Receiver<String>,
    output: W,
    row_count: NonZeroUsize,
    export_path: PathBuf,
}

impl<W: AsyncWrite + Unpin + Send> InteractiveLoop<W> {
    pub fn new(
        store: Arc<dyn SampleStore>,
        exporter: Arc<dyn SpreadsheetExporter>,
        input: mpsc::Receiver<String>,
        output: W,
        row_count: NonZeroUsize,
        export_path: PathBuf,
    ) -> Self {
        Self {
            store,
            exporter,
            input,
            output,
            row_count,
            export_path,
        }
    }

    /// Prompts and handles commands until exit, end of input or cancellation.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<MenuExit, MenuError> {
        loop {
            self.prompt().await?;

            let line = tokio::select! {
                biased;

                _ = shutdown.cancelled() => return Ok(MenuExit::Cancelled),
                line = self.input.recv() => line,
            };

            let Some(line) = line else {
                info!("console input closed");
                return Ok(MenuExit::InputClosed);
            };

            match Command::parse(&line) {
                Some(Command::Exit) => {
                    self.say("Exiting.").await?;
                    return Ok(MenuExit::Operator);
                }
                Some(Command::Export) => self.export_recent().await?,
                None => debug!(input = line.trim(), "ignoring unrecognised menu input"),
            }
        }
    }

    async fn prompt(&mut self) -> io::Result<()> {
        let menu = format!(
            "1. Export the last {} samples to {}\n0. Exit\n\nChoice: ",
            self.row_count,
            self.export_path.display()
        );
        self.output.write_all(menu.as_bytes()).await?;
        self.output.flush().await
    }

    async fn say(&mut self, message: &str) -> io::Result<()> {
        self.output.write_all(message.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    async fn export_recent(&mut self) -> io::Result<()> {
        let records = match self.store.query_recent(self.row_count).await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "failed to read stored samples");
                return self.say(&format!("Could not read stored samples: {err}")).await;
            }
        };

        if records.is_empty() {
            return self.say("No data found").await;
        }

        let exporter = Arc::clone(&self.exporter);
        let destination = self.export_path.clone();
        let outcome =
            tokio::task::spawn_blocking(move || exporter.export(&records, &destination)).await;

        let message = match outcome {
            Ok(Ok(ExportOutcome::Written { rows, path })) => {
                format!("Saved {rows} samples to {}", path.display())
            }
            Ok(Ok(ExportOutcome::Locked { path })) => {
                format!("Close {} and try again", path.display())
            }
            Ok(Err(err)) => {
                error!(error = %err, "export failed");
                format!("Export failed: {err}")
            }
            Err(err) => {
                error!(error = %err, "export task failed");
                format!("Export failed: {err}")
            }
        };

        self.say(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        export::ExportError,
        model::{Coordinates, PrecipitationKind, StoredSample, WeatherSample, WindDirection},
        storage::MemoryStore,
    };
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, DuplexStream};

    /// Records what it was asked to export and answers with a fixed outcome.
    #[derive(Default)]
    struct FakeExporter {
        calls: Mutex<Vec<usize>>,
        locked: bool,
    }

    impl SpreadsheetExporter for FakeExporter {
        fn export(
            &self,
            records: &[StoredSample],
            destination: &Path,
        ) -> Result<ExportOutcome, ExportError> {
            self.calls.lock().unwrap().push(records.len());
            if self.locked {
                Ok(ExportOutcome::Locked {
                    path: destination.to_path_buf(),
                })
            } else {
                Ok(ExportOutcome::Written {
                    rows: records.len(),
                    path: destination.to_path_buf(),
                })
            }
        }
    }

    fn sample() -> WeatherSample {
        WeatherSample {
            temperature: Some(5.0),
            wind_speed: Some(2.0),
            wind_direction: WindDirection::West,
            pressure: 750,
            precipitation_amount: Some(0.0),
            precipitation_kind: PrecipitationKind::default(),
            location: Coordinates::new(10.0, 20.0),
        }
    }

    struct Harness {
        menu: InteractiveLoop<DuplexStream>,
        console: DuplexStream,
        input: mpsc::Sender<String>,
    }

    fn harness(store: Arc<MemoryStore>, exporter: Arc<FakeExporter>, rows: usize) -> Harness {
        let (tx, rx) = mpsc::channel(8);
        let (output, console) = tokio::io::duplex(64 * 1024);
        let menu = InteractiveLoop::new(
            store,
            exporter,
            rx,
            output,
            NonZeroUsize::new(rows).unwrap(),
            PathBuf::from("weather.xlsx"),
        );

        Harness {
            menu,
            console,
            input: tx,
        }
    }

    async fn drain(mut console: DuplexStream) -> String {
        let mut text = String::new();
        console.read_to_string(&mut text).await.unwrap();
        text
    }

    #[test]
    fn parses_menu_choices() {
        assert_eq!(Command::parse("1"), Some(Command::Export));
        assert_eq!(Command::parse(" 0\r\n"), Some(Command::Exit));
        assert_eq!(Command::parse("2"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("10"), None);
    }

    #[tokio::test]
    async fn empty_store_reports_no_data_and_skips_export() {
        let exporter = Arc::new(FakeExporter::default());
        let h = harness(Arc::new(MemoryStore::new()), Arc::clone(&exporter), 5);

        h.input.send("1".into()).await.unwrap();
        h.input.send("0".into()).await.unwrap();

        let exit = h.menu.run(CancellationToken::new()).await.unwrap();
        assert_eq!(exit, MenuExit::Operator);

        let text = drain(h.console).await;
        assert!(text.contains("No data found"));
        assert!(exporter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_passes_at_most_row_count_records() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..7 {
            store.append(sample()).await.unwrap();
        }
        let exporter = Arc::new(FakeExporter::default());
        let h = harness(store, Arc::clone(&exporter), 3);

        h.input.send("1".into()).await.unwrap();
        h.input.send("0".into()).await.unwrap();
        h.menu.run(CancellationToken::new()).await.unwrap();

        assert_eq!(*exporter.calls.lock().unwrap(), vec![3]);
        let text = drain(h.console).await;
        assert!(text.contains("Saved 3 samples to weather.xlsx"));
    }

    #[tokio::test]
    async fn locked_destination_asks_operator_to_close_it() {
        let store = Arc::new(MemoryStore::new());
        store.append(sample()).await.unwrap();
        let exporter = Arc::new(FakeExporter {
            locked: true,
            ..Default::default()
        });
        let h = harness(store, exporter, 3);

        h.input.send("1".into()).await.unwrap();
        h.input.send("0".into()).await.unwrap();
        let exit = h.menu.run(CancellationToken::new()).await.unwrap();

        assert_eq!(exit, MenuExit::Operator);
        assert!(drain(h.console).await.contains("Close weather.xlsx and try again"));
    }

    #[tokio::test]
    async fn unrecognised_input_reprompts() {
        let exporter = Arc::new(FakeExporter::default());
        let h = harness(Arc::new(MemoryStore::new()), Arc::clone(&exporter), 1);

        for line in ["7", "export", "", "0"] {
            h.input.send(line.into()).await.unwrap();
        }
        let exit = h.menu.run(CancellationToken::new()).await.unwrap();

        assert_eq!(exit, MenuExit::Operator);
        let text = drain(h.console).await;
        assert_eq!(text.matches("Choice: ").count(), 4);
        assert!(exporter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_input_ends_the_loop() {
        let h = harness(Arc::new(MemoryStore::new()), Arc::new(FakeExporter::default()), 1);
        drop(h.input);

        let exit = h.menu.run(CancellationToken::new()).await.unwrap();
        assert_eq!(exit, MenuExit::InputClosed);
    }

    #[tokio::test]
    async fn cancellation_interrupts_waiting_for_input() {
        let h = harness(Arc::new(MemoryStore::new()), Arc::new(FakeExporter::default()), 1);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(h.menu.run(shutdown.clone()));
        tokio::task::yield_now().await;
        shutdown.cancel();

        assert_eq!(task.await.unwrap().unwrap(), MenuExit::Cancelled);
        drop(h.input);
    }
}
