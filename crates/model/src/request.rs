use serde::{Deserialize, Serialize};

/// Who authored a turn in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// The human participant.
    User,
    /// The storyteller model.
    Ai,
}

/// An image attached to a user submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageData {
    /// IANA media type of the image, e.g. `image/png`.
    pub mime_type: String,
    /// Raw image bytes, base64-encoded.
    pub data: String,
}

/// One prior turn, as a provider sees it when building its prompt.
///
/// Providers only need the text of the conversation; image payloads
/// are never replayed, an image-only turn simply has no text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriorTurn {
    /// Who authored the turn.
    pub author: Author,
    /// The turn's text, absent for image-only turns.
    pub text: Option<String>,
}

/// A request to be sent to the story provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoryRequest {
    /// The conversation so far, excluding the input being answered.
    pub history: Vec<PriorTurn>,
    /// The new raw user text.
    pub input: String,
    /// An image accompanying the input.
    pub image: Option<ImageData>,
}
