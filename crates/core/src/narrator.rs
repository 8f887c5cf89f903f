//! The narration capability.

/// A cancellable text-to-speech capability with a single utterance
/// slot: starting a new utterance always cancels the one in progress,
/// so no two narrations ever play back-to-back.
///
/// Narration is best-effort. Implementations must degrade silently
/// when the platform has no speech capability; nothing here returns a
/// result.
pub trait Narrator: Send + Sync {
    /// Cancels the current utterance, if any, and speaks `text`.
    fn speak(&self, text: &str);

    /// Cancels the current utterance, if any.
    fn cancel(&self);
}

/// A narrator that stays silent.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNarrator;

impl Narrator for NoopNarrator {
    fn speak(&self, _text: &str) {}

    fn cancel(&self) {}
}
