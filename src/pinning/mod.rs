// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! IPFS pinning and NFT metadata publication.
//!
//! Two raw operations against the pinning service (`pin_url`, `pin_json`) and
//! the `NftPublisher` composing them: pin the generated image, then pin the
//! metadata object `{name, description, image}` whose hash becomes the mint
//! URI.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const PINATA_API_BASE_URL: &str = "https://api.pinata.cloud";

#[derive(Debug, thiserror::Error)]
pub enum PinningError {
    #[error("Pinning request failed: {0}")]
    Request(String),

    #[error("Pinning service returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Content-addressed storage seam.
#[async_trait]
pub trait Pinner: Send + Sync {
    /// Pin the content behind a URL; returns its IPFS hash.
    async fn pin_url(&self, url: &str) -> Result<String, PinningError>;

    /// Pin a JSON value; returns its IPFS hash.
    async fn pin_json(&self, value: &Value) -> Result<String, PinningError>;
}

/// Pinata-backed pinner authenticated with a JWT.
pub struct PinataPinner {
    jwt: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataPinner {
    pub fn new(jwt: &str) -> Self {
        Self::with_base_url(jwt, PINATA_API_BASE_URL)
    }

    pub fn with_base_url(jwt: &str, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            jwt: jwt.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn parse_pin_response(response: reqwest::Response) -> Result<String, PinningError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinningError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: PinResponse = response
            .json()
            .await
            .map_err(|e| PinningError::Request(e.to_string()))?;
        Ok(body.ipfs_hash)
    }
}

#[async_trait]
impl Pinner for PinataPinner {
    async fn pin_url(&self, url: &str) -> Result<String, PinningError> {
        // The pinning API takes file bytes; download first, then multipart.
        let file = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PinningError::Request(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| PinningError::Request(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(file.to_vec()).file_name("artwork.png");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/pinning/pinFileToIPFS", self.base_url))
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PinningError::Request(e.to_string()))?;

        Self::parse_pin_response(response).await
    }

    async fn pin_json(&self, value: &Value) -> Result<String, PinningError> {
        let response = self
            .http
            .post(format!("{}/pinning/pinJSONToIPFS", self.base_url))
            .bearer_auth(&self.jwt)
            .json(&json!({ "pinataContent": value }))
            .send()
            .await
            .map_err(|e| PinningError::Request(e.to_string()))?;

        Self::parse_pin_response(response).await
    }
}

/// Publishes a settled auction's artwork and metadata.
pub struct NftPublisher {
    pinner: Arc<dyn Pinner>,
}

impl NftPublisher {
    pub fn new(pinner: Arc<dyn Pinner>) -> Self {
        Self { pinner }
    }

    /// Pin the image, then the metadata object. Returns the metadata hash,
    /// which the collection stores as the token URI.
    pub async fn publish(
        &self,
        name: &str,
        description: &str,
        image_url: &str,
    ) -> Result<String, PinningError> {
        let image_hash = self.pinner.pin_url(image_url).await?;

        let metadata = json!({
            "name": name,
            "description": description,
            "image": image_hash,
        });

        self.pinner.pin_json(&metadata).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingPinner {
        json_bodies: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Pinner for RecordingPinner {
        async fn pin_url(&self, _url: &str) -> Result<String, PinningError> {
            Ok("QmImageHash".to_string())
        }

        async fn pin_json(&self, value: &Value) -> Result<String, PinningError> {
            self.json_bodies.lock().unwrap().push(value.clone());
            Ok("QmMetadataHash".to_string())
        }
    }

    #[tokio::test]
    async fn publish_pins_image_then_metadata() {
        let pinner = Arc::new(RecordingPinner {
            json_bodies: Mutex::new(Vec::new()),
        });
        let publisher = NftPublisher::new(pinner.clone());

        let uri = publisher
            .publish("C", "test user prompt", "https://img.example/1.png")
            .await
            .unwrap();

        assert_eq!(uri, "QmMetadataHash");
        let bodies = pinner.json_bodies.lock().unwrap();
        assert_eq!(
            bodies[0],
            json!({
                "name": "C",
                "description": "test user prompt",
                "image": "QmImageHash",
            })
        );
    }
}
