//! Builds generation payloads, invokes the model and extracts its text.

use super::client::GenerateContent;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Modality, Part};
use crate::encoder::EncodedAttachment;
use crate::errors::{Error, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Text produced by the model, in the order the parts were returned. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    fragments: Vec<String>,
}

impl GenerationOutput {
    /// The canonical output: the first non-empty text part
    pub fn text(&self) -> &str {
        &self.fragments[0]
    }

    /// Every text fragment, canonical output first
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn into_text(self) -> String {
        self.fragments.into_iter().next().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn GenerateContent>,
    model: String,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn GenerateContent>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Send one prompt, with an optional attachment, and return the text of the first candidate.
    ///
    /// Upstream failures are returned as-is; there is no retry.
    #[instrument(skip_all, fields(model = %self.model, has_attachment = attachment.is_some()))]
    pub async fn generate(&self, prompt: &str, attachment: Option<EncodedAttachment>) -> Result<GenerationOutput> {
        let request = build_request(prompt, attachment);
        let response = self.client.generate_content(&self.model, &request).await?;
        let output = extract_output(response)?;
        debug!(fragments = output.fragments().len(), "Model returned output");
        Ok(output)
    }
}

/// Assemble the content sequence: the prompt, then the attachment if there is one.
///
/// Requests with an attachment ask for a text-only response; text-only requests carry no
/// generation config at all.
pub fn build_request(prompt: &str, attachment: Option<EncodedAttachment>) -> GenerateContentRequest {
    let mut parts = vec![Part::text(prompt)];
    let generation_config = attachment.map(|attachment| {
        parts.push(Part::inline_data(attachment.media_type, attachment.data));
        GenerationConfig {
            response_modalities: Some(vec![Modality::Text]),
        }
    });

    GenerateContentRequest {
        contents: vec![Content::user(parts)],
        generation_config,
    }
}

/// Pull the ordered, non-empty text parts out of the first candidate.
pub fn extract_output(response: GenerateContentResponse) -> Result<GenerationOutput> {
    if let Some(reason) = response.prompt_feedback.as_ref().and_then(|feedback| feedback.block_reason.as_deref()) {
        debug!(block_reason = reason, "Prompt was blocked by the model");
    }

    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .filter(|parts| !parts.is_empty())
        .ok_or(Error::EmptyResult)?;

    let fragments: Vec<String> = parts
        .into_iter()
        .filter_map(|part| part.text)
        .filter(|text| !text.is_empty())
        .collect();

    if fragments.is_empty() {
        return Err(Error::EmptyResult);
    }

    Ok(GenerationOutput { fragments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::{Candidate, PromptFeedback};
    use crate::test_utils::ScriptedModel;

    fn response_with_parts(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: Some(parts),
                }),
                finish_reason: Some("STOP".to_string()),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_only_request_has_single_part_and_no_config() {
        let request = build_request("Hello", None);
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].parts, Some(vec![Part::text("Hello")]));
        assert!(request.generation_config.is_none());
    }

    #[test]
    fn test_attachment_follows_prompt_and_requests_text() {
        let attachment = EncodedAttachment {
            media_type: "audio/mpeg".to_string(),
            data: "AAEC".to_string(),
        };
        let request = build_request("Transcribe", Some(attachment));

        assert_eq!(
            request.contents[0].parts,
            Some(vec![Part::text("Transcribe"), Part::inline_data("audio/mpeg", "AAEC")])
        );
        assert_eq!(
            request.generation_config.unwrap().response_modalities,
            Some(vec![Modality::Text])
        );
    }

    #[test]
    fn test_extract_keeps_order_and_skips_empty_text() {
        let response = response_with_parts(vec![
            Part::inline_data("image/png", "aGk="),
            Part::text(""),
            Part::text("first"),
            Part::text("second"),
        ]);

        let output = extract_output(response).unwrap();
        assert_eq!(output.text(), "first");
        assert_eq!(output.fragments(), ["first".to_string(), "second".to_string()]);
        assert_eq!(output.into_text(), "first");
    }

    #[test]
    fn test_no_candidates_is_empty_result() {
        let response = GenerateContentResponse {
            candidates: Some(vec![]),
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some("SAFETY".to_string()),
            }),
            ..Default::default()
        };
        let err = extract_output(response).unwrap_err();
        assert!(matches!(err, Error::EmptyResult));
        assert_eq!(err.to_string(), "No valid output from model");

        assert!(matches!(extract_output(GenerateContentResponse::default()), Err(Error::EmptyResult)));
    }

    #[test]
    fn test_candidate_without_parts_is_empty_result() {
        assert!(matches!(extract_output(response_with_parts(vec![])), Err(Error::EmptyResult)));

        let no_content = GenerateContentResponse {
            candidates: Some(vec![Candidate::default()]),
            ..Default::default()
        };
        assert!(matches!(extract_output(no_content), Err(Error::EmptyResult)));
    }

    #[test]
    fn test_parts_without_text_is_empty_result() {
        let response = response_with_parts(vec![Part::inline_data("image/png", "aGk=")]);
        assert!(matches!(extract_output(response), Err(Error::EmptyResult)));
    }

    #[tokio::test]
    async fn test_generate_sends_configured_model() {
        let model = ScriptedModel::replying("Hi there");
        let dispatcher = Dispatcher::new(model.clone(), "gemini-1.5-flash");

        let output = dispatcher.generate("Hello", None).await.unwrap();
        assert_eq!(output.text(), "Hi there");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "gemini-1.5-flash");
        assert_eq!(calls[0].1, build_request("Hello", None));
    }

    #[tokio::test]
    async fn test_generate_propagates_upstream_error() {
        let model = ScriptedModel::failing("quota exceeded");
        let dispatcher = Dispatcher::new(model.clone(), "gemini-1.5-flash");

        let err = dispatcher.generate("Hello", None).await.unwrap_err();
        assert!(matches!(&err, Error::Upstream { message } if message == "quota exceeded"));
        assert_eq!(model.calls().len(), 1);
    }
}
