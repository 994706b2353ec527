// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Image generation client.
//!
//! One operation: turn the winning user prompt plus the collection's system
//! prompt into an image URL. The system prompt steers the style; the two are
//! concatenated with a blank line between them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, thiserror::Error)]
pub enum ArtError {
    #[error("Image request failed: {0}")]
    Request(String),

    #[error("Image service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Image service returned no image")]
    NoImage,
}

/// Text-to-image generation seam.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return its URL.
    async fn generate_url(&self, prompt: &str, system_prompt: &str) -> Result<String, ArtError>;
}

/// OpenAI images-API generator.
pub struct OpenAiImageGenerator {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

impl OpenAiImageGenerator {
    pub fn new(api_key: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate_url(&self, prompt: &str, system_prompt: &str) -> Result<String, ArtError> {
        let response = self
            .http
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "prompt": compose_prompt(system_prompt, prompt),
                "n": 1,
                "size": IMAGE_SIZE,
                "response_format": "url",
            }))
            .send()
            .await
            .map_err(|e| ArtError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArtError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ArtError::Request(e.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or(ArtError::NoImage)
    }
}

/// `system_prompt`, blank line, `prompt`.
pub fn compose_prompt(system_prompt: &str, prompt: &str) -> String {
    format!("{system_prompt}\n\n{prompt}")
}
