use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    model::{OrderId, OrderStatus},
    provider::truncate_body,
};

use super::{ImageGenerator, ImageSettings};

pub const DEFAULT_BASE_URL: &str = "https://api.neural.love";

#[derive(Debug, Clone)]
pub struct NeuralLoveGenerator {
    api_key: String,
    base_url: String,
    settings: ImageSettings,
    http: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    prompt: &'a str,
    style: &'a str,
    layout: &'a str,
    amount: u8,
    is_hd: bool,
    is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(default)]
    output: Vec<OrderOutput>,
}

#[derive(Debug, Deserialize)]
struct OrderOutput {
    full: Option<String>,
}

impl NeuralLoveGenerator {
    pub fn new(api_key: String, settings: ImageSettings) -> Self {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, settings: ImageSettings, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            http: Client::new(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let mut value = HeaderValue::from_str(&self.api_key)
            .context("Image API key is not a valid header value")?;
        value.set_sensitive(true);

        Ok(request.header(AUTHORIZATION, value))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String> {
        let res = self
            .authorized(request)?
            .send()
            .await
            .with_context(|| format!("Failed to send request to neural.love ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read neural.love {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "neural.love {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl ImageGenerator for NeuralLoveGenerator {
    #[instrument(skip(self))]
    async fn submit(&self, prompt: &str) -> Result<OrderId> {
        let payload = GenerateRequest {
            prompt,
            style: &self.settings.style,
            layout: &self.settings.layout,
            amount: 1,
            is_hd: self.settings.hd,
            is_public: self.settings.public,
        };

        let request = self
            .http
            .post(format!("{}/v1/ai-art/generate", self.base_url))
            .json(&payload);
        let body = self.send(request, "generate").await?;

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse neural.love generate JSON")?;

        debug!(order_id = %parsed.order_id, "Image order accepted");
        Ok(OrderId::new(parsed.order_id))
    }

    #[instrument(skip(self), fields(order_id = %order))]
    async fn order_status(&self, order: &OrderId) -> Result<OrderStatus> {
        let request = self
            .http
            .get(format!("{}/v1/ai-art/orders/{}", self.base_url, order.as_str()));
        let body = self.send(request, "order").await?;

        let parsed: OrderResponse =
            serde_json::from_str(&body).context("Failed to parse neural.love order JSON")?;

        let image_url = parsed.output.into_iter().find_map(|o| o.full);
        Ok(match image_url {
            Some(image_url) => OrderStatus::Ready { image_url },
            None => OrderStatus::InProgress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn submit_posts_prompt_with_settings() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/ai-art/generate")
            .match_header("authorization", "Bearer SECRET")
            .match_body(Matcher::Json(json!({
                "prompt": "light rain in Vancouver in March weather",
                "style": "nature",
                "layout": "square",
                "amount": 1,
                "isHd": false,
                "isPublic": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"ord-42","price":{"amount":1}}"#)
            .create_async()
            .await;

        let generator = NeuralLoveGenerator::with_base_url(
            "Bearer SECRET".into(),
            ImageSettings::default(),
            server.url(),
        );
        let order = generator.submit("light rain in Vancouver in March weather").await?;

        mock.assert_async().await;
        assert_eq!(order, OrderId::new("ord-42"));

        Ok(())
    }

    #[tokio::test]
    async fn submit_reports_rejection() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/v1/ai-art/generate")
            .with_status(402)
            .with_body(r#"{"error":"not enough credits"}"#)
            .create_async()
            .await;

        let generator = NeuralLoveGenerator::with_base_url(
            "KEY".into(),
            ImageSettings::default(),
            server.url(),
        );
        let err = generator.submit("fog").await.unwrap_err();

        assert!(err.to_string().contains("402"));
    }

    #[tokio::test]
    async fn order_status_is_in_progress_without_output() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/ai-art/orders/ord-42")
            .match_header("authorization", "KEY")
            .with_status(200)
            .with_body(r#"{"status":{"code":1},"output":[]}"#)
            .create_async()
            .await;

        let generator = NeuralLoveGenerator::with_base_url(
            "KEY".into(),
            ImageSettings::default(),
            server.url(),
        );
        let status = generator.order_status(&OrderId::new("ord-42")).await?;

        mock.assert_async().await;
        assert_eq!(status, OrderStatus::InProgress);

        Ok(())
    }

    #[tokio::test]
    async fn order_status_returns_full_image_url() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/ai-art/orders/ord-42")
            .with_status(200)
            .with_body(
                r#"{"output":[{
                    "full":"https://cdn.example/full.jpg",
                    "preview":"https://cdn.example/p.jpg"
                }]}"#,
            )
            .create_async()
            .await;

        let generator = NeuralLoveGenerator::with_base_url(
            "KEY".into(),
            ImageSettings::default(),
            server.url(),
        );
        let status = generator.order_status(&OrderId::new("ord-42")).await?;

        assert_eq!(
            status,
            OrderStatus::Ready { image_url: "https://cdn.example/full.jpg".into() }
        );

        Ok(())
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let generator = NeuralLoveGenerator::new("bad\nkey".into(), ImageSettings::default());
        let request = generator.http.get("http://localhost/");

        assert!(generator.authorized(request).is_err());
    }
}
