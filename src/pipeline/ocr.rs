//! OCR of table-as-image reports.
//!
//! Two backends produce the same thing, a grid of cells:
//!
//! * [`OcrEngine::Vision`] posts the PNG to Cloud Vision text detection and
//!   lays the returned word boxes out with the shared grid builder.
//! * [`OcrEngine::Vlm`] asks a vision LLM to transcribe the table as CSV.
//!
//! The grid is then written to disk as the report's sheet, which the sheet
//! cleaner reads back.

use crate::config::{OcrBackend, RunConfig};
use crate::error::{AqError, ReportError};
use crate::pipeline::encode::{encode_for_vlm, encode_png_base64};
use crate::pipeline::layout::{build_grid, Word};
use crate::prompts::{transcription_request, TABLE_TRANSCRIPTION_PROMPT};
use crate::table::{Cell, RawTable};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

const DEFAULT_VLM_MODEL: &str = "gpt-4.1-nano";

/// An OCR backend ready to read page images.
#[derive(Clone)]
pub enum OcrEngine {
    Vision {
        client: Client,
        api_key: String,
        /// Word confidence floor in 0.0–1.0.
        min_confidence: f32,
    },
    Vlm {
        provider: Arc<dyn LLMProvider>,
        timeout: Duration,
    },
}

impl std::fmt::Debug for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrEngine::Vision { min_confidence, .. } => f
                .debug_struct("Vision")
                .field("min_confidence", min_confidence)
                .finish_non_exhaustive(),
            OcrEngine::Vlm { timeout, .. } => f
                .debug_struct("Vlm")
                .field("provider", &"<dyn LLMProvider>")
                .field("timeout", timeout)
                .finish(),
        }
    }
}

impl OcrEngine {
    /// Build the configured backend.
    ///
    /// Returns `Ok(None)` for the Vision backend without an API key: image
    /// reports are then recorded as failed, text reports still run. A VLM
    /// backend that cannot be created is fatal.
    pub fn from_config(config: &RunConfig) -> Result<Option<Self>, AqError> {
        match config.ocr_backend {
            OcrBackend::Vision => {
                let Some(api_key) = config.vision_api_key.clone() else {
                    warn!("No Cloud Vision API key; table-as-image reports will be skipped");
                    return Ok(None);
                };
                let client = Client::builder()
                    .timeout(request_timeout(config))
                    .build()
                    .map_err(|e| AqError::Internal(format!("HTTP client: {}", e)))?;
                Ok(Some(OcrEngine::Vision {
                    client,
                    api_key,
                    min_confidence: f32::from(config.ocr_min_confidence) / 100.0,
                }))
            }
            OcrBackend::Vlm => Ok(Some(OcrEngine::Vlm {
                provider: resolve_provider(config)?,
                timeout: request_timeout(config),
            })),
        }
    }

    /// Read the table in `image` as a grid of cells.
    pub async fn read_table(
        &self,
        file: &str,
        image: &DynamicImage,
    ) -> Result<Vec<Vec<Cell>>, ReportError> {
        let fail = |detail: String| ReportError::Ocr {
            file: file.to_string(),
            detail,
        };

        match self {
            OcrEngine::Vision {
                client,
                api_key,
                min_confidence,
            } => {
                let content = encode_png_base64(image).map_err(|e| fail(e.to_string()))?;
                let response = annotate(client, api_key, content)
                    .await
                    .map_err(fail)?;
                let words = response.words(*min_confidence);
                debug!("{}: {} words above confidence floor", file, words.len());
                Ok(build_grid(words))
            }
            OcrEngine::Vlm { provider, timeout } => {
                let image = encode_for_vlm(image).map_err(|e| fail(e.to_string()))?;
                let messages = vec![
                    ChatMessage::system(TABLE_TRANSCRIPTION_PROMPT),
                    ChatMessage::user_with_images(&transcription_request(file), vec![image]),
                ];
                let options = CompletionOptions {
                    temperature: Some(0.0),
                    max_tokens: Some(4096),
                    ..Default::default()
                };

                let response = tokio::time::timeout(*timeout, provider.chat(&messages, Some(&options)))
                    .await
                    .map_err(|_| fail(format!("no reply within {:?}", timeout)))?
                    .map_err(|e| fail(e.to_string()))?;
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    file, response.prompt_tokens, response.completion_tokens
                );
                parse_csv_reply(&response.content).map_err(fail)
            }
        }
    }
}

/// Per-request timeout of the configured backend.
fn request_timeout(config: &RunConfig) -> Duration {
    Duration::from_secs(match config.ocr_backend {
        OcrBackend::Vision => config.ocr_timeout_secs,
        OcrBackend::Vlm => config.api_timeout_secs,
    })
}

/// Resolve the VLM provider: named provider + model, then the
/// `EDGEQUAKE_LLM_PROVIDER`/`EDGEQUAKE_MODEL` pair, then auto-detection.
fn resolve_provider(config: &RunConfig) -> Result<Arc<dyn LLMProvider>, AqError> {
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VLM_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AqError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;
    info!("VLM OCR via auto-detected provider");
    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AqError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AqError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

// ── Cloud Vision ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    pages: Vec<VisionPage>,
}

#[derive(Debug, Default, Deserialize)]
struct VisionPage {
    #[serde(default)]
    blocks: Vec<VisionBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct VisionBlock {
    #[serde(default)]
    paragraphs: Vec<VisionParagraph>,
}

#[derive(Debug, Default, Deserialize)]
struct VisionParagraph {
    #[serde(default)]
    words: Vec<VisionWord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisionWord {
    bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    symbols: Vec<VisionSymbol>,
    confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

/// Vision omits zero coordinates.
#[derive(Debug, Default, Deserialize)]
struct Vertex {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

#[derive(Debug, Default, Deserialize)]
struct VisionSymbol {
    #[serde(default)]
    text: String,
}

impl AnnotateResponse {
    /// Words at or above `min_confidence`, as boxes for the grid builder.
    fn words(&self, min_confidence: f32) -> Vec<Word> {
        self.responses
            .iter()
            .filter_map(|r| r.full_text_annotation.as_ref())
            .flat_map(|a| &a.pages)
            .flat_map(|p| &p.blocks)
            .flat_map(|b| &b.paragraphs)
            .flat_map(|p| &p.words)
            .filter(|w| w.confidence.map_or(true, |c| c >= min_confidence))
            .filter_map(VisionWord::to_word)
            .collect()
    }
}

impl VisionWord {
    fn to_word(&self) -> Option<Word> {
        let text: String = self.symbols.iter().map(|s| s.text.as_str()).collect();
        let vertices = &self.bounding_box.as_ref()?.vertices;
        if text.is_empty() || vertices.is_empty() {
            return None;
        }
        let (mut left, mut top) = (f32::INFINITY, f32::INFINITY);
        let (mut right, mut bottom) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for v in vertices {
            left = left.min(v.x);
            right = right.max(v.x);
            top = top.min(v.y);
            bottom = bottom.max(v.y);
        }
        Some(Word::new(text, left, top, right, bottom))
    }
}

async fn annotate(client: &Client, api_key: &str, content: String) -> Result<AnnotateResponse, String> {
    let body = AnnotateRequest {
        requests: [AnnotateImageRequest {
            image: ImageContent { content },
            features: [Feature {
                kind: "DOCUMENT_TEXT_DETECTION",
            }],
        }],
    };

    let response = client
        .post(VISION_ENDPOINT)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {}: {}", status, text.trim()));
    }

    let parsed: AnnotateResponse = response.json().await.map_err(|e| e.to_string())?;
    if let Some(err) = parsed.responses.iter().find_map(|r| r.error.as_ref()) {
        return Err(format!("Vision error {}: {}", err.code, err.message));
    }
    Ok(parsed)
}

// ── VLM reply ────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:csv)?\n(.*)\n```\s*$").unwrap());

fn strip_csv_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => trimmed,
    }
}

/// Parse a CSV reply into cells; empty fields are missing.
fn parse_csv_reply(reply: &str) -> Result<Vec<Vec<Cell>>, String> {
    let body = strip_csv_fences(reply);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("reply is not CSV: {}", e))?;
        rows.push(
            record
                .iter()
                .map(|f| {
                    let f = f.trim();
                    (!f.is_empty()).then(|| f.to_string())
                })
                .collect(),
        );
    }
    if rows.is_empty() {
        return Err("empty transcription".to_string());
    }
    Ok(rows)
}

// ── Sheet ────────────────────────────────────────────────────────────────

/// Write an OCR grid to `path` as a CSV sheet; missing cells are empty fields.
pub fn write_sheet(file: &str, path: &Path, grid: Vec<Vec<Cell>>) -> Result<(), ReportError> {
    let fail = |detail: String| ReportError::Ocr {
        file: file.to_string(),
        detail: format!("writing sheet {}: {}", path.display(), detail),
    };

    let table = RawTable::new(file, grid);
    let mut writer = csv::Writer::from_path(path).map_err(|e| fail(e.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
            .map_err(|e| fail(e.to_string()))?;
    }
    writer.flush().map_err(|e| fail(e.to_string()))?;
    debug!("Wrote {}x{} sheet {}", table.len(), table.width(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISION_REPLY: &str = r#"{
      "responses": [{
        "fullTextAnnotation": {
          "pages": [{
            "blocks": [{
              "paragraphs": [{
                "words": [
                  {"boundingBox": {"vertices": [{"x": 10, "y": 10}, {"x": 40, "y": 10}, {"x": 40, "y": 20}, {"y": 20, "x": 10}]},
                   "symbols": [{"text": "1"}, {"text": "-"}, {"text": "J"}], "confidence": 0.97},
                  {"boundingBox": {"vertices": [{"x": 80, "y": 10}, {"x": 95, "y": 10}, {"x": 95, "y": 20}, {"x": 80, "y": 20}]},
                   "symbols": [{"text": "4"}, {"text": "2"}], "confidence": 0.31},
                  {"boundingBox": {"vertices": [{"y": 0}, {"x": 5}, {"x": 5, "y": 4}, {"y": 4}]},
                   "symbols": [{"text": "."}]}
                ]
              }]
            }]
          }]
        }
      }]
    }"#;

    #[test]
    fn vision_words_respect_confidence_floor() {
        let parsed: AnnotateResponse = serde_json::from_str(VISION_REPLY).unwrap();
        let words = parsed.words(0.5);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["1-J", "."]);
        assert_eq!(words[0], Word::new("1-J", 10.0, 10.0, 40.0, 20.0));
        assert_eq!(words[1], Word::new(".", 0.0, 0.0, 5.0, 4.0));
    }

    #[test]
    fn vision_floor_zero_keeps_all() {
        let parsed: AnnotateResponse = serde_json::from_str(VISION_REPLY).unwrap();
        assert_eq!(parsed.words(0.0).len(), 3);
    }

    #[test]
    fn vision_error_payload_deserialises() {
        let parsed: AnnotateResponse = serde_json::from_str(
            r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#,
        )
        .unwrap();
        let err = parsed.responses[0].error.as_ref().unwrap();
        assert_eq!(err.code, 3);
        assert!(parsed.words(0.0).is_empty());
    }

    #[test]
    fn request_body_shape() {
        let body = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: "AAAA".into(),
                },
                features: [Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["requests"][0]["image"]["content"], "AAAA");
        assert_eq!(json["requests"][0]["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
    }

    #[test]
    fn csv_reply_fences_are_stripped() {
        let reply = "```csv\nDate,NO2\n1-Jan,\"12,5\"\n2-Jan,\n```\n";
        let rows = parse_csv_reply(reply).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1].as_deref(), Some("12,5"));
        assert_eq!(rows[2][1], None);
    }

    #[test]
    fn ragged_csv_reply_is_accepted() {
        let rows = parse_csv_reply("Title\nDate,NO2,SO2\n").unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert!(parse_csv_reply("```\n\n```").is_err());
        assert!(parse_csv_reply("   ").is_err());
    }

    #[test]
    fn vision_without_key_is_unavailable() {
        let config = RunConfig::builder().build().unwrap();
        assert!(OcrEngine::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn each_backend_uses_its_own_timeout() {
        let vision = RunConfig::builder()
            .ocr_timeout_secs(15)
            .api_timeout_secs(60)
            .build()
            .unwrap();
        assert_eq!(request_timeout(&vision), Duration::from_secs(15));

        let vlm = RunConfig::builder()
            .ocr_backend(OcrBackend::Vlm)
            .ocr_timeout_secs(15)
            .api_timeout_secs(60)
            .build()
            .unwrap();
        assert_eq!(request_timeout(&vlm), Duration::from_secs(60));
    }

    #[test]
    fn sheet_pads_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Jan2020.csv");
        write_sheet(
            "Jan2020.png",
            &path,
            vec![
                vec![Some("Title".into())],
                vec![Some("Date".into()), None, Some("NO2".into())],
            ],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Title,,\nDate,,NO2\n");
    }
}
