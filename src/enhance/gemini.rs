use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{Generation, GenerationOptions, GenerativeClient, RemoteFile, UsageMetadata};
use crate::config::GeminiConfig;
use crate::error::{OpenVttError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

// -- Request types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    FileData(FileData),
    Text(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadStartFile<'a>,
}

#[derive(Debug, Serialize)]
struct UploadStartFile<'a> {
    display_name: &'a str,
}

// -- Response types --

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini REST API client
///
/// `request_timeout` applies per API call; the streamed upload body has no
/// whole-request deadline.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Map non-success statuses; 404 becomes `RemoteNotFound`
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(OpenVttError::RemoteNotFound(format!("{}: {}", what, body)));
        }

        Err(OpenVttError::Enhancement(format!(
            "{} failed {}: {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
        let size = tokio::fs::metadata(path).await?.len();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video");

        let start = self
            .client
            .post(self.url("upload/v1beta/files"))
            .header(API_KEY_HEADER, &self.api_key)
            .header("x-goog-upload-protocol", "resumable")
            .header("x-goog-upload-command", "start")
            .header("x-goog-upload-header-content-length", size.to_string())
            .header("x-goog-upload-header-content-type", mime_type)
            .timeout(self.request_timeout)
            .json(&UploadStart {
                file: UploadStartFile { display_name },
            })
            .send()
            .await?;
        let start = Self::check(start, "Upload start").await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                OpenVttError::Enhancement("Upload start returned no session URL".to_string())
            })?;
        debug!("Upload session opened for {} ({} bytes)", display_name, size);

        let file = tokio::fs::File::open(path).await?;
        let finish = self
            .client
            .post(upload_url)
            .header(header::CONTENT_LENGTH, size)
            .header("x-goog-upload-offset", "0")
            .header("x-goog-upload-command", "upload, finalize")
            .body(file)
            .send()
            .await?;
        let finish = Self::check(finish, "Upload").await?;

        let uploaded: UploadResponse = finish.json().await?;
        debug!("Uploaded {} as {}", display_name, uploaded.file.name);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .client
            .get(self.url(&format!("v1beta/{}", name)))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = Self::check(response, "File lookup").await?;

        Ok(response.json().await?)
    }

    async fn generate(
        &self,
        file: &RemoteFile,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation> {
        let mut tools = Vec::new();
        if options.google_search {
            tools.push(Tool {
                google_search: GoogleSearch {},
            });
        }

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::FileData(FileData {
                        mime_type: file.mime_type.clone(),
                        file_uri: file.uri.clone(),
                    }),
                    Part::Text(prompt.to_string()),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
            tools,
        };

        let response = self
            .client
            .post(self.url(&format!("v1beta/models/{}:generateContent", options.model)))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response, "Generation").await?;

        let body: GenerateResponse = response.json().await?;
        let text = body.text();
        if text.is_empty() {
            return Err(OpenVttError::Enhancement(
                "Model returned no text".to_string(),
            ));
        }

        Ok(Generation {
            text,
            usage: body.usage_metadata,
        })
    }
}
