use story_weaver_model::StoryRequest;
use tokio::sync::{mpsc, watch};

use super::StoryControllerBuilder;
use crate::generator_client::{GenerateResult, GeneratorClient};
use crate::narrator::Narrator;
use crate::session::{Session, Turn, UserInput};
use crate::store::SessionStore;

/// The user-facing message every generation failure collapses to.
pub const GENERATION_FAILED_ERROR: &str =
    "Failed to generate the story. Please try again.";

/// The lifecycle stage of the current logical turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing is in flight and nothing has failed.
    #[default]
    Idle,
    /// A submission is waiting for the generator.
    Submitting,
    /// A failed submission is being retried.
    Retrying,
    /// The last submission failed; its input is retained for retry.
    Failed,
}

impl Status {
    fn is_in_flight(self) -> bool {
        matches!(self, Status::Submitting | Status::Retrying)
    }
}

/// A point-in-time view of the session, published on every change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The transcript so far.
    pub history: Vec<Turn>,
    /// The branch options currently offered to the user.
    pub choices: Option<[String; 2]>,
    /// The stage of the current turn.
    pub status: Status,
    /// The user-visible error banner, if any.
    pub error: Option<String>,
    /// Whether a failed submission is available for retry.
    pub can_retry: bool,
}

#[derive(Debug)]
pub(super) enum Command {
    Submit(UserInput),
    Retry,
    Reset,
    GenerationFinished {
        generation: u64,
        result: GenerateResult,
    },
}

pub(super) struct ControllerState {
    generator: GeneratorClient,
    store: SessionStore,
    narrator: Box<dyn Narrator>,
    command_tx: mpsc::UnboundedSender<Command>,
    snapshot_tx: watch::Sender<SessionSnapshot>,

    session: Session,
    pending_request: Option<UserInput>,
    status: Status,
    error: Option<String>,
    // Bumped on every dispatch and on reset; a finished generation
    // carrying an older value is stale and must be dropped.
    generation: u64,
}

impl ControllerState {
    pub(super) fn new(
        builder: StoryControllerBuilder,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        command_tx: &mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            generator: builder.generator,
            store: builder.store,
            narrator: builder.narrator,
            command_tx: command_tx.clone(),
            snapshot_tx,
            session: Session::default(),
            pending_request: None,
            status: Status::default(),
            error: None,
            generation: 0,
        }
    }

    pub(super) async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        if let Some(session) = self.store.load().await {
            self.session = session;
        }
        self.publish();

        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Submit(input) => self.submit(input).await,
                Command::Retry => self.retry(),
                Command::Reset => self.reset().await,
                Command::GenerationFinished { generation, result } => {
                    self.generation_finished(generation, result).await;
                }
            }
        }
    }

    async fn submit(&mut self, input: UserInput) {
        if self.status.is_in_flight() {
            debug!("ignoring a submission while another is in flight");
            return;
        }
        self.status = Status::Submitting;
        self.session.current_choices = None;
        self.error = None;
        self.narrator.cancel();

        // The generator receives the prior context and the new input as
        // separate arguments, so the prior turns are captured before the
        // user turn is appended.
        let prior: Vec<_> =
            self.session.history.iter().map(Turn::prior).collect();
        self.session.history.push(Turn::user(&input));
        self.store.save(&self.session).await;
        self.pending_request = Some(input.clone());

        self.dispatch(StoryRequest {
            history: prior,
            input: input.text,
            image: input.image,
        });
        self.publish();
    }

    fn retry(&mut self) {
        let Some(input) = self.pending_request.clone() else {
            debug!("ignoring a retry without a pending request");
            return;
        };
        if self.status != Status::Failed {
            debug!("ignoring a retry while not in the failed state");
            return;
        }
        self.status = Status::Retrying;
        self.error = None;
        self.session.current_choices = None;

        // The unanswered user turn is the last history entry; the prompt
        // context is everything before it.
        let prior: Vec<_> = self
            .session
            .history
            .split_last()
            .map(|(_, rest)| rest.iter().map(Turn::prior).collect())
            .unwrap_or_default();

        self.dispatch(StoryRequest {
            history: prior,
            input: input.text,
            image: input.image,
        });
        self.publish();
    }

    async fn reset(&mut self) {
        self.narrator.cancel();
        self.session = Session::default();
        self.pending_request = None;
        self.error = None;
        self.status = Status::Idle;
        // Invalidate any in-flight generation.
        self.generation += 1;
        self.store.clear().await;
        self.publish();
    }

    async fn generation_finished(
        &mut self,
        generation: u64,
        result: GenerateResult,
    ) {
        if generation != self.generation {
            trace!("dropping a stale generation result");
            return;
        }
        match result {
            Ok(beat) => {
                self.session.history.push(Turn::ai(&beat));
                self.session.current_choices = Some(beat.choices.clone());
                self.pending_request = None;
                self.status = Status::Idle;
                self.store.save(&self.session).await;
                self.narrator.speak(&beat.story);
            }
            Err(_) => {
                // Network, auth and malformed-output failures all
                // collapse to one retryable error; the specifics were
                // already logged at the client boundary.
                self.error = Some(GENERATION_FAILED_ERROR.to_string());
                self.status = Status::Failed;
            }
        }
        self.publish();
    }

    fn dispatch(&mut self, request: StoryRequest) {
        self.generation += 1;
        let generation = self.generation;
        let generator = self.generator.clone();
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = generator.generate(request).await;
            command_tx
                .send(Command::GenerationFinished { generation, result })
                .ok();
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            history: self.session.history.clone(),
            choices: self.session.current_choices.clone(),
            status: self.status,
            error: self.error.clone(),
            can_retry: self.pending_request.is_some()
                && self.status == Status::Failed,
        });
    }
}
