//! Conversation and session types.

use serde::{Deserialize, Serialize};
use story_weaver_model::{Author, ImageData, PriorTurn, StoryBeat};

/// One entry in the conversation transcript.
///
/// A meaningful turn has at least one of `text`/`image_url`; AI turns
/// always have text. Serialization matches the persisted layout, so
/// absent fields are omitted rather than written as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored the turn.
    pub author: Author,
    /// The turn's text, absent for image-only user turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// A self-contained `data:` URL, so the transcript survives a
    /// reload without any external image storage.
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// The branching pair offered by an AI turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<[String; 2]>,
}

impl Turn {
    /// Creates the user turn for a submission.
    ///
    /// Image-bearing submissions omit the literal text, so the
    /// transcript shows only the image.
    pub fn user(input: &UserInput) -> Self {
        match &input.image {
            Some(image) => Self {
                author: Author::User,
                text: None,
                image_url: Some(format!(
                    "data:{};base64,{}",
                    image.mime_type, image.data
                )),
                choices: None,
            },
            None => Self {
                author: Author::User,
                text: Some(input.text.clone()),
                image_url: None,
                choices: None,
            },
        }
    }

    /// Creates the AI turn for a generated beat.
    pub fn ai(beat: &StoryBeat) -> Self {
        Self {
            author: Author::Ai,
            text: Some(beat.story.clone()),
            image_url: None,
            choices: Some(beat.choices.clone()),
        }
    }

    /// Projects this turn into the form providers replay in prompts.
    pub fn prior(&self) -> PriorTurn {
        PriorTurn {
            author: self.author,
            text: self.text.clone(),
        }
    }
}

/// A raw user submission, kept verbatim so a failed turn can be
/// retried with the exact same input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInput {
    /// The submitted text.
    pub text: String,
    /// An attached image.
    pub image: Option<ImageData>,
}

impl UserInput {
    /// Creates a text-only input.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Creates an input carrying an image.
    pub fn with_image(text: impl Into<String>, image: ImageData) -> Self {
        Self {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// The persisted unit: the transcript plus the currently offered
/// choice pair. Pending requests and transient status never enter a
/// session, a reload finds no in-flight state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The ordered transcript.
    pub history: Vec<Turn>,
    /// The branch options offered after the most recent AI turn.
    #[serde(rename = "currentChoices")]
    pub current_choices: Option<[String; 2]>,
}

impl Session {
    /// Whether there is nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.current_choices.is_none()
    }
}
