use std::pin::Pin;
use std::sync::Arc;

use story_weaver_model::{
    StoryBeat, StoryProvider, StoryProviderError, StoryRequest,
};
use tracing::Instrument;

pub type GenerateResult = Result<StoryBeat, Box<dyn StoryProviderError>>;
type BoxedGenerateFuture = Pin<Box<dyn Future<Output = GenerateResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(StoryRequest) -> BoxedGenerateFuture + Send + Sync>;

/// A wrapper around a story provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct GeneratorClient {
    handler_fn: HandlerFn,
}

impl GeneratorClient {
    #[inline]
    pub fn new<P: StoryProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `GeneratorClient` doesn't
        // have a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.generate(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(beat) => {
                            trace!("finished a request");
                            Ok(beat)
                        }
                        Err(err) => {
                            error!(
                                "generation failed ({:?}): {err}",
                                err.kind()
                            );
                            Err(Box::new(err) as Box<dyn StoryProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("generator client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and returns the generated beat.
    #[inline]
    pub async fn generate(&self, req: StoryRequest) -> GenerateResult {
        (self.handler_fn)(req).await
    }
}

#[cfg(test)]
mod tests {
    use story_weaver_model::ErrorKind;
    use story_weaver_test_model::{PresetBeat, TestStoryProvider};

    use super::*;

    #[tokio::test]
    async fn test_generate() {
        let mut provider = TestStoryProvider::default();
        provider.add_beat(PresetBeat::new("S1", "C1", "C2"));

        let client = GeneratorClient::new(provider);
        let beat = client
            .generate(StoryRequest {
                history: vec![],
                input: "Hello".to_owned(),
                image: None,
            })
            .await
            .unwrap();
        assert_eq!(beat.story, "S1");
        assert_eq!(beat.choices, ["C1", "C2"]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let client = GeneratorClient::new(TestStoryProvider::default());
        let err = client
            .generate(StoryRequest {
                history: vec![],
                input: "Hello".to_owned(),
                image: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
