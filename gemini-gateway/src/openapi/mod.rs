//! OpenAPI documentation for the generation endpoints at `/gemini-api/*`.
//!
//! Served as JSON at `/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gemini Gateway API",
        description = "Send a prompt, optionally with an image, document or audio file, and get the model's text back."
    ),
    servers(
        (url = "/gemini-api", description = "Generation API")
    ),
    paths(
        api::handlers::generate::generate_text,
        api::handlers::generate::generate_from_image,
        api::handlers::generate::generate_from_document,
        api::handlers::generate::generate_from_audio,
    ),
    components(
        schemas(
            api::models::envelope::ResponseEnvelope,
            api::models::generate::TextPrompt,
            api::models::generate::ImagePromptForm,
            api::models::generate::DocumentPromptForm,
            api::models::generate::AudioPromptForm,
        )
    ),
    tags(
        (name = "generation", description = "Text generation from prompts and attachments")
    )
)]
pub struct ApiDoc;
