//! Gemini `generateContent` client used as the analysis service.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::analysis::{AnalysisFuture, AnalysisService};
use crate::config::DrawConfig;
use crate::error::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    prompt: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    pub fn from_config(config: &DrawConfig) -> Result<Self> {
        let key = config.api_key.clone().ok_or_else(|| {
            Error::Config("no API key: set api_key in the config or GEMINI_API_KEY".into())
        })?;
        Ok(Self::new(key, &config.gemini_model, &config.prompt))
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }

    async fn generate(self, image: RgbImage) -> Result<String> {
        let body = request_body(&self.prompt, &image)?;
        debug!("Sending {}x{} canvas to {}", image.width(), image.height(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("API error {}: {}", status, text)));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("Malformed response: {}", e)))?;
        extract_text(&parsed)
    }
}

impl AnalysisService for GeminiClient {
    fn analyze(&self, image: RgbImage) -> AnalysisFuture {
        Box::pin(self.clone().generate(image))
    }
}

/// PNG-encode the canvas and wrap it with the prompt as one user turn.
fn request_body(prompt: &str, image: &RgbImage) -> Result<Value> {
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;

    Ok(json!({
        "contents": [{
            "parts": [
                { "text": prompt },
                { "inline_data": { "mime_type": "image/png", "data": STANDARD.encode(png.into_inner()) } }
            ]
        }]
    }))
}

/// Join the text parts of the first candidate.
fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(Error::Analysis(format!("Request blocked: {}", reason)));
    }

    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| Error::Analysis("Response has no candidates".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(Error::Analysis("Response contained no text".into()));
    }
    Ok(text)
}
