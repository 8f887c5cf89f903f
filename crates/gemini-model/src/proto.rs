use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use story_weaver_model::StoryRequest;

use crate::prompt;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

/// The structured payload the model is instructed to produce.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StoryPayload {
    pub story: String,
    pub choice1: String,
    pub choice2: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
enum Part {
    #[serde(rename = "inlineData")]
    InlineData(InlineData),
    #[serde(rename = "text")]
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "story": {
                "type": "STRING",
                "description": "The next part of the story, 2-3 sentences long.",
            },
            "choice1": {
                "type": "STRING",
                "description": "The first distinct choice for the user to continue the story.",
            },
            "choice2": {
                "type": "STRING",
                "description": "The second distinct choice for the user to continue the story.",
            },
        },
        "required": ["story", "choice1", "choice2"],
    })
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &StoryRequest) -> GenerateContentRequest {
    let text = prompt::build_prompt(&req.history, &req.input, req.image.is_some());

    // The image part must precede the instruction text.
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = &req.image {
        parts.push(Part::InlineData(InlineData {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        }));
    }
    parts.push(Part::Text(text));

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            temperature: 0.8,
        },
    }
}

/// Concatenates the text parts of the first candidate, if any.
pub fn extract_text(resp: &GenerateContentResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let mut text = String::new();
    for part in &content.parts {
        if let Some(part_text) = &part.text {
            text.push_str(part_text);
        }
    }
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use story_weaver_model::{Author, ImageData, PriorTurn};

    use super::*;

    #[test]
    fn test_create_request_with_image() {
        let request = StoryRequest {
            history: vec![],
            input: String::new(),
            image: Some(ImageData {
                mime_type: "image/png".to_owned(),
                data: "aGVsbG8=".to_owned(),
            }),
        };
        let body = create_request(&request);

        let value = serde_json::to_value(&body).unwrap();
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert!(
            parts[1]["text"]
                .as_str()
                .unwrap()
                .contains("Analyze this image")
        );
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            value["generationConfig"]["responseSchema"]["required"],
            json!(["story", "choice1", "choice2"])
        );
    }

    #[test]
    fn test_create_request_text_only() {
        let request = StoryRequest {
            history: vec![PriorTurn {
                author: Author::User,
                text: Some("Hello".to_owned()),
            }],
            input: "Keep going".to_owned(),
            image: None,
        };
        let body = create_request(&request);

        let value = serde_json::to_value(&body).unwrap();
        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0]["text"].as_str().unwrap().contains("Keep going"));
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let resp = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![
                        CandidatePart {
                            text: Some("{\"story\":".to_owned()),
                        },
                        CandidatePart {
                            text: Some("\"...\"}".to_owned()),
                        },
                    ],
                }),
            }],
        };
        assert_eq!(
            extract_text(&resp).as_deref(),
            Some("{\"story\":\"...\"}")
        );
    }

    #[test]
    fn test_extract_text_empty_response() {
        let resp = GenerateContentResponse { candidates: vec![] };
        assert_eq!(extract_text(&resp), None);
    }
}
