use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{PdfRenderer, RenderError};

/// Posts the document to an HTML-to-PDF service as `multipart/form-data`.
pub struct HttpPdfRenderer {
    client: reqwest::Client,
    url: String,
}

impl HttpPdfRenderer {
    pub fn new(url: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| format!("Failed to build PDF renderer client: {e}"))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str, base_url: &str) -> Result<Vec<u8>, RenderError> {
        let document = Part::text(html.to_string())
            .file_name("index.html")
            .mime_str("text/html")
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let form = Form::new()
            .part("files", document)
            .text("base_url", base_url.to_string());

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RenderError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
