use story_weaver_model::StoryProvider;

use super::StoryController;
use crate::generator_client::GeneratorClient;
use crate::narrator::{Narrator, NoopNarrator};
use crate::store::SessionStore;

/// [`StoryController`] builder.
pub struct StoryControllerBuilder {
    pub(crate) generator: GeneratorClient,
    pub(crate) store: SessionStore,
    pub(crate) narrator: Box<dyn Narrator>,
}

impl StoryControllerBuilder {
    /// Creates a new builder with the specified provider and store.
    #[inline]
    pub fn new<P: StoryProvider + 'static>(
        provider: P,
        store: SessionStore,
    ) -> Self {
        Self {
            generator: GeneratorClient::new(provider),
            store,
            narrator: Box::new(NoopNarrator),
        }
    }

    /// Attaches a narrator to speak each new story beat.
    #[inline]
    pub fn with_narrator(
        mut self,
        narrator: impl Narrator + 'static,
    ) -> Self {
        self.narrator = Box::new(narrator);
        self
    }

    /// Builds the controller and spawns its owning task.
    ///
    /// The task restores the persisted session before serving its
    /// first command.
    #[inline]
    pub fn build(self) -> StoryController {
        StoryController::spawn(self)
    }
}
