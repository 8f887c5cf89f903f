use std::error::Error;

use crate::error::ErrorKind;
use crate::request::StoryRequest;
use crate::response::StoryBeat;

/// The error type for a story provider.
pub trait StoryProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a story-generation backend.
///
/// Once the provider is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not
/// rely on it, and the provider should be prepared for being dropped
/// anytime.
pub trait StoryProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: StoryProviderError;

    /// Generates the next story beat for the given request.
    fn generate(
        &self,
        req: &StoryRequest,
    ) -> impl Future<Output = Result<StoryBeat, Self::Error>> + Send + 'static;
}
