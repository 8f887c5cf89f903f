use serde::{Deserialize, Serialize};

/// A generated story beat: the next piece of narration plus exactly
/// two branching choices.
///
/// The two-ness of the choice pair is part of the protocol, so it is
/// carried in the type rather than validated at every use site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryBeat {
    /// The next part of the story, typically 2-3 sentences.
    pub story: String,
    /// The two branching options offered to the user.
    pub choices: [String; 2],
}
