use story_weaver_model::{Author, PriorTurn};

/// Builds the natural-language instruction for the next story beat.
///
/// Four variants exist, selected by context: the opening of a story
/// from an image, a mid-story image addition, a "surprise me" twist
/// (matched case-insensitively anywhere in the input), and the plain
/// continuation from the user's literal text. Every variant demands
/// exactly two new branching choices in the structured result.
pub fn build_prompt(
    history: &[PriorTurn],
    user_input: &str,
    new_image: bool,
) -> String {
    let story_so_far = render_story_so_far(history);

    if history.is_empty() && new_image {
        return "You are an imaginative storyteller. Analyze this image. \
                Based on what you see (objects, mood, environment, people, \
                style), start a short, engaging story of 2-3 sentences. End \
                your response by providing two distinct, branching choices \
                for me to continue the adventure. Respond in the required \
                JSON format."
            .to_string();
    }

    if new_image {
        return format!(
            "You are an imaginative storyteller continuing a story we are \
             writing together. Here is the story so far:\n{story_so_far}\n\n\
             Now, I'm adding this new scene from the image provided. Weave \
             this image into the narrative in 2-3 sentences, continuing from \
             where we left off. Then, give me two new, distinct choices to \
             continue. Respond in the required JSON format."
        );
    }

    if user_input.to_lowercase().contains("surprise me") {
        return format!(
            "You are an imaginative storyteller continuing a story we are \
             writing together. Here is the story so far:\n{story_so_far}\n\n\
             My choice is to be surprised! Continue the story in 2-3 \
             sentences with a completely unexpected and creative twist that \
             I wouldn't see coming. Then, give me two new, distinct choices \
             to continue. Respond in the required JSON format."
        );
    }

    format!(
        "You are an imaginative storyteller continuing a story we are \
         writing together. Here is the story so far:\n{story_so_far}\n\n\
         My choice or addition is: \"{user_input}\". Continue the story in \
         2-3 sentences based on my input. Then, give me two new, distinct \
         choices to continue. Respond in the required JSON format."
    )
}

fn render_story_so_far(history: &[PriorTurn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.author {
                Author::User => "You",
                Author::Ai => "I",
            };
            let text = turn.text.as_deref().unwrap_or("[Image provided]");
            format!("{speaker} said: \"{text}\"")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_turn(text: &str) -> PriorTurn {
        PriorTurn {
            author: Author::User,
            text: Some(text.to_owned()),
        }
    }

    fn ai_turn(text: &str) -> PriorTurn {
        PriorTurn {
            author: Author::Ai,
            text: Some(text.to_owned()),
        }
    }

    #[test]
    fn test_first_turn_with_image() {
        let prompt = build_prompt(&[], "", true);
        assert!(prompt.contains("Analyze this image"));
        assert!(prompt.contains("two distinct, branching choices"));
    }

    #[test]
    fn test_later_turn_with_image() {
        let history = [user_turn("A door creaks."), ai_turn("You step in.")];
        let prompt = build_prompt(&history, "", true);
        assert!(prompt.contains("Weave this image into the narrative"));
        assert!(prompt.contains("You said: \"A door creaks.\""));
        assert!(prompt.contains("I said: \"You step in.\""));
    }

    #[test]
    fn test_surprise_me_is_case_insensitive() {
        let history = [user_turn("Hello"), ai_turn("Once upon a time...")];
        for input in ["surprise me", "Surprise Me!", "I choose SURPRISE ME"] {
            let prompt = build_prompt(&history, input, false);
            assert!(
                prompt.contains("completely unexpected and creative twist"),
                "input {input:?} did not select the twist variant"
            );
        }
    }

    #[test]
    fn test_literal_continuation() {
        let history = [user_turn("Hello"), ai_turn("Once upon a time...")];
        let prompt = build_prompt(&history, "Open the chest", false);
        assert!(
            prompt.contains("My choice or addition is: \"Open the chest\"")
        );
    }

    #[test]
    fn test_image_only_turn_renders_placeholder() {
        let history = [PriorTurn {
            author: Author::User,
            text: None,
        }];
        let prompt = build_prompt(&history, "Go on", false);
        assert!(prompt.contains("You said: \"[Image provided]\""));
    }
}
