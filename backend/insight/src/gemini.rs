use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{
    error::InsightError,
    models::{ENDPOINT, GENERATE_METHOD, GenerateRequest, GenerateResponse, ModelList},
    summary::TextGenerator,
};

const MODEL_PREFIX: &str = "models/";

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self, InsightError> {
        Self::with_endpoint(ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str) -> Result<Self, InsightError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

async fn failed(response: reqwest::Response) -> InsightError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    InsightError::Generation(format!("{status}: {body}"))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn available_models(&self) -> Result<Vec<String>, InsightError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/models", self.endpoint))
                .query(&[("key", self.api_key.as_str()), ("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(failed(response).await);
            }

            let page: ModelList = response.json().await?;
            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
                    .map(|m| {
                        m.name
                            .strip_prefix(MODEL_PREFIX)
                            .map(str::to_string)
                            .unwrap_or(m.name)
                    }),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Models offering {GENERATE_METHOD}: {models:?}");
        Ok(models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InsightError> {
        let response = self
            .client
            .post(format!(
                "{}/{MODEL_PREFIX}{model}:{GENERATE_METHOD}",
                self.endpoint
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::prompt(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failed(response).await);
        }

        let body: GenerateResponse = response.json().await?;
        body.text()
            .ok_or_else(|| InsightError::Generation("empty completion".to_string()))
    }
}
