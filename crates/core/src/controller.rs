mod builder;
mod state;

use tokio::sync::{mpsc, watch};

use crate::session::UserInput;
pub use builder::StoryControllerBuilder;
pub use state::{GENERATION_FAILED_ERROR, SessionSnapshot, Status};
use state::{Command, ControllerState};

/// Handle to the task that owns the session.
///
/// All session mutations flow through this handle as messages, so the
/// owning task is the single writer of the history, the pending choice
/// pair, and the in-flight status. Observers read consistent snapshots
/// through [`subscribe`](Self::subscribe).
///
/// At most one generation is logically in flight at a time: a submit
/// that arrives while one is running is ignored, and a reset that
/// arrives mid-flight invalidates the running generation so its late
/// result is discarded.
#[derive(Clone)]
pub struct StoryController {
    command_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl StoryController {
    /// Submits a new user input, starting one logical turn.
    ///
    /// Ignored while another submission or retry is in flight.
    pub fn submit(&self, input: UserInput) {
        self.send(Command::Submit(input));
    }

    /// Retries the last failed submission with its original input.
    ///
    /// Ignored unless the previous turn failed. Re-triggerable
    /// indefinitely while it keeps failing.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Starts a new story: clears the session, the persisted snapshot,
    /// and any narration in progress.
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Returns a receiver observing every session state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    fn send(&self, command: Command) {
        self.command_tx
            .send(command)
            .expect("controller task has been dropped too early");
    }

    fn spawn(builder: StoryControllerBuilder) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(SessionSnapshot::default());
        let state = ControllerState::new(builder, snapshot_tx, &command_tx);
        tokio::spawn(state.run(command_rx));
        Self {
            command_tx,
            snapshot_rx,
        }
    }
}
