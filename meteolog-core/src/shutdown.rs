//! Runs the poll loop and the menu side by side and tears both down together.
//!
//! Whichever task finishes first (normally the menu, after the operator picks
//! exit) triggers cancellation of the other. [`Coordinator::run`] only returns
//! once both tasks have been joined.

use tokio::{io::AsyncWrite, task::JoinError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    menu::{InteractiveLoop, MenuError, MenuExit},
    poller::{PollLoop, SampleSink},
    storage::StorageError,
};

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("poll loop failed")]
    Poll(#[from] StorageError),

    #[error("interactive loop failed")]
    Menu(#[from] MenuError),

    #[error("a background task panicked or was aborted")]
    Join(#[from] JoinError),
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub menu_exit: MenuExit,
}

pub struct Coordinator<K: ?Sized, W> {
    poll: PollLoop<K>,
    menu: InteractiveLoop<W>,
}

impl<K, W> Coordinator<K, W>
where
    K: SampleSink + ?Sized + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(poll: PollLoop<K>, menu: InteractiveLoop<W>) -> Self {
        Self { poll, menu }
    }

    /// Runs both loops until one of them stops or `shutdown` is cancelled.
    ///
    /// A poll failure is reported ahead of anything the menu returned, since
    /// it means a sample could not be stored.
    pub async fn run(self, shutdown: CancellationToken) -> Result<ShutdownReport, ShutdownError> {
        let token = shutdown.child_token();

        let mut poll_task = tokio::spawn(self.poll.run(token.clone()));
        let mut menu_task = tokio::spawn(self.menu.run(token.clone()));

        let (poll_result, menu_result) = tokio::select! {
            menu_result = &mut menu_task => {
                info!("interactive loop finished; stopping poll loop");
                token.cancel();
                (poll_task.await, menu_result)
            }
            poll_result = &mut poll_task => {
                warn!("poll loop finished first; stopping interactive loop");
                token.cancel();
                (poll_result, menu_task.await)
            }
        };

        poll_result??;
        let menu_exit = menu_result??;

        info!(?menu_exit, "shutdown complete");
        Ok(ShutdownReport { menu_exit })
    }
}
