//! A local fake story provider for testing purpose.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use story_weaver_model::{
    Author, ErrorKind, StoryBeat, StoryProvider, StoryProviderError,
    StoryRequest,
};
use tokio::time::sleep;

/// Error type for [`TestStoryProvider`].
#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl StoryProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A preset story beat for one position in the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetBeat {
    /// The beat to return once the step succeeds.
    pub beat: StoryBeat,
    /// How many attempts at this step fail before one succeeds.
    pub failures: u64,
}

impl PresetBeat {
    /// Creates a preset beat with the given story and choices.
    pub fn new(
        story: impl Into<String>,
        choice1: impl Into<String>,
        choice2: impl Into<String>,
    ) -> Self {
        Self {
            beat: StoryBeat {
                story: story.into(),
                choices: [choice1.into(), choice2.into()],
            },
            failures: 0,
        }
    }

    /// Sets failure times before a successful response.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = failures;
        self
    }
}

/// A local fake story provider for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how
/// the provider should respond at each position of the conversation.
/// The step is selected by counting the user turns in the request
/// history, so a retried request hits the same step again. If there is
/// no step at that position, an error is returned.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy
/// memory copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestStoryProvider {
    steps: Vec<PresetBeat>,
    attempts: Arc<Mutex<HashMap<usize, u64>>>,
    delay: Option<Duration>,
}

impl TestStoryProvider {
    /// Appends a preset beat to the script.
    #[inline]
    pub fn add_beat(&mut self, preset: PresetBeat) {
        self.steps.push(preset);
    }

    /// Delays every response by the given duration.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    fn next_outcome(&self, req: &StoryRequest) -> Result<StoryBeat, Error> {
        let step_idx = req
            .history
            .iter()
            .filter(|turn| turn.author == Author::User)
            .count();
        let Some(step) = self.steps.get(step_idx) else {
            return Err(Error {
                message: "no more scripted beats",
                kind: ErrorKind::Other,
            });
        };

        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts.entry(step_idx).or_insert(0);
        *attempt += 1;
        if *attempt <= step.failures {
            return Err(Error {
                message: "scripted failure",
                kind: ErrorKind::Network,
            });
        }
        Ok(step.beat.clone())
    }
}

impl StoryProvider for TestStoryProvider {
    type Error = Error;

    fn generate(
        &self,
        req: &StoryRequest,
    ) -> impl Future<Output = Result<StoryBeat, Self::Error>> + Send + 'static
    {
        let outcome = self.next_outcome(req);
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            outcome
        }
    }
}
