// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client for local AI inference

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{RenamerError, Result};

/// Anything that turns a prompt into generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logging
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Sampling and instruction options for a generate call
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub num_predict: Option<u32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingOptions>,
}

#[derive(Serialize)]
struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                RenamerError::OllamaUnavailable(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| RenamerError::OllamaUnavailable(e.to_string()))?;

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate text completion
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        debug!("Sending request to Ollama: model={}", model);
        self.send(model, prompt, None, options).await
    }

    /// Generate with image (for vision models)
    pub async fn generate_with_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String> {
        debug!("Sending vision request to Ollama: model={}", model);
        self.send(model, prompt, Some(image_base64), &GenerateOptions::default()).await
    }

    /// Generate with retry logic
    pub async fn generate_with_retry(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        retries: u32,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                warn!("Retrying Ollama request in {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            match self.generate(model, prompt, options).await {
                Ok(response) => {
                    info!(
                        "{} responded with {} characters ({:.2}s, attempt {})",
                        model,
                        response.trim().len(),
                        start.elapsed().as_secs_f64(),
                        attempt + 1
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Ollama call failed on attempt {}: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RenamerError::OllamaUnavailable("Unknown error".to_string())
        }))
    }

    async fn send(
        &self,
        model: &str,
        prompt: &str,
        image_base64: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let sampling = if options.temperature.is_some() || options.num_predict.is_some() {
            Some(SamplingOptions {
                temperature: options.temperature,
                num_predict: options.num_predict,
            })
        } else {
            None
        };

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            system: options.system.as_deref(),
            images: image_base64.map(|img| vec![img]),
            options: sampling,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenamerError::OllamaUnavailable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

/// Strip API endpoint suffixes so both `http://host:11434` and
/// `http://host:11434/api/generate` work as configured URLs
pub fn normalize_base_url(base_url: &str) -> String {
    base_url
        .trim_end_matches('/')
        .replace("/api/generate", "")
        .replace("/api/chat", "")
}

/// Whether `model` is present in an Ollama model listing
pub fn model_in_list(models: &[String], model: &str) -> bool {
    let latest = format!("{}:latest", model);
    models.iter().any(|m| *m == model || *m == latest)
}

/// Text model backed by Ollama, with retries and fixed sampling options
pub struct OllamaTextModel {
    client: OllamaClient,
    model: String,
    options: GenerateOptions,
    retries: u32,
}

impl OllamaTextModel {
    pub fn new(client: OllamaClient, model: String, options: GenerateOptions, retries: u32) -> Self {
        Self { client, model, options, retries }
    }
}

#[async_trait]
impl TextGenerator for OllamaTextModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self.client
            .generate_with_retry(&self.model, prompt, &self.options, self.retries)
            .await?;
        Ok(response.trim().to_string())
    }
}

/// Pick a text model tier for the given amount of memory
pub fn model_for_memory(memory_gb: u64) -> &'static str {
    if memory_gb > 40 {
        "gpt-oss:20b"
    } else if memory_gb > 14 {
        "phi4:14b-q4_K_M"
    } else if memory_gb > 4 {
        "llama3.2:3b-instruct-q5_K_M"
    } else {
        "llama3.2:1b-instruct-q4_K_M"
    }
}

/// Detect total system memory in whole gigabytes
pub fn detect_memory_gb() -> Option<u64> {
    if cfg!(target_os = "macos") {
        let output = Command::new("sysctl").args(["-n", "hw.memsize"]).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let bytes: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
        Some(bytes / (1024 * 1024 * 1024))
    } else {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo_gb(&meminfo)
    }
}

/// Parse the `MemTotal` line of `/proc/meminfo` into gigabytes
pub fn parse_meminfo_gb(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / (1024 * 1024))
}

/// Resolve the configured text model, selecting one by memory for `auto`,
/// and make sure it is installed
pub async fn resolve_text_model(client: &OllamaClient, configured: &str) -> Result<String> {
    let model_name = if configured.eq_ignore_ascii_case("auto") {
        let memory_gb = detect_memory_gb().ok_or_else(|| {
            RenamerError::Config(
                "Unable to detect system memory for model selection; set ai_engine.models.text"
                    .to_string(),
            )
        })?;
        let model = model_for_memory(memory_gb);
        info!("Detected {} GB memory, selected text model {}", memory_gb, model);
        model.to_string()
    } else {
        configured.to_string()
    };

    let available = client.list_models().await?;
    if !model_in_list(&available, &model_name) {
        let available_display = if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        };
        return Err(RenamerError::ModelNotFound(format!(
            "Required model '{}' not found locally. Available models: {}. Try: ollama pull {}",
            model_name, available_display, model_name
        )));
    }

    Ok(model_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://localhost:11434/api/generate"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://gpu-box:11434/api/chat"), "http://gpu-box:11434");
    }

    #[test]
    fn test_model_in_list() {
        let models = vec!["moondream:latest".to_string(), "phi4:14b-q4_K_M".to_string()];
        assert!(model_in_list(&models, "moondream"));
        assert!(model_in_list(&models, "phi4:14b-q4_K_M"));
        assert!(!model_in_list(&models, "llava:7b"));
    }

    #[test]
    fn test_model_in_list_ignores_prefixes() {
        let models = vec!["llava-phi3:latest".to_string(), "llava:7b".to_string()];
        assert!(!model_in_list(&models, "llava"));
        assert!(!model_in_list(&models, "llava:7"));
        assert!(model_in_list(&models, "llava-phi3"));
        assert!(model_in_list(&models, "llava:7b"));
    }

    #[test]
    fn test_model_for_memory_tiers() {
        assert_eq!(model_for_memory(64), "gpt-oss:20b");
        assert_eq!(model_for_memory(41), "gpt-oss:20b");
        assert_eq!(model_for_memory(40), "phi4:14b-q4_K_M");
        assert_eq!(model_for_memory(16), "phi4:14b-q4_K_M");
        assert_eq!(model_for_memory(8), "llama3.2:3b-instruct-q5_K_M");
        assert_eq!(model_for_memory(4), "llama3.2:1b-instruct-q4_K_M");
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       16318480 kB\nMemFree:         1234567 kB\n";
        assert_eq!(parse_meminfo_gb(meminfo), Some(15));
        assert_eq!(parse_meminfo_gb("MemFree: 12 kB"), None);
    }

    #[test]
    fn test_request_omits_empty_options() {
        let request = GenerateRequest {
            model: "moondream",
            prompt: "describe",
            stream: false,
            system: None,
            images: Some(vec!["aGVsbG8="]),
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["images"][0], "aGVsbG8=");
        assert!(json.get("system").is_none());
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_request_with_sampling_options() {
        let request = GenerateRequest {
            model: "phi4",
            prompt: "name it",
            stream: false,
            system: Some("be brief"),
            images: None,
            options: Some(SamplingOptions { temperature: Some(0.2), num_predict: Some(120) }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["options"]["num_predict"], 120);
        assert!(json.get("images").is_none());
    }
}
