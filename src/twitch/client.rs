use async_trait::async_trait;
use reqwest::Client;

use super::{
    auth::TokenCache,
    errors::{body_excerpt, ApiError, PollError},
    types::{PollResult, StreamsResponse},
};

/// Helix streams エンドポイント
pub const STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";

/// 1リクエストで指定できる user_login の上限
const MAX_LOGINS_PER_REQUEST: usize = 100;

/// ポーリング対象の配信状態を取得するソース
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn query_streams(&self, channel_names: &[String]) -> Result<PollResult, PollError>;
}

/// Twitch Helix streams クライアント
pub struct StreamQueryClient {
    client: Client,
    tokens: TokenCache,
    streams_url: String,
}

impl StreamQueryClient {
    pub fn new(client: Client, tokens: TokenCache) -> Self {
        Self::with_endpoint(client, tokens, STREAMS_URL)
    }

    pub fn with_endpoint(client: Client, tokens: TokenCache, streams_url: impl Into<String>) -> Self {
        Self {
            client,
            tokens,
            streams_url: streams_url.into(),
        }
    }
}

#[async_trait]
impl StreamSource for StreamQueryClient {
    /// 指定チャンネルの配信状態を1回のGETでまとめて取得
    ///
    /// レスポンスに含まれないチャンネルはオフライン扱い
    async fn query_streams(&self, channel_names: &[String]) -> Result<PollResult, PollError> {
        let mut result = PollResult::offline(channel_names);
        if result.is_empty() {
            log::debug!("No channels requested, skipping streams query");
            return Ok(result);
        }

        if result.len() > MAX_LOGINS_PER_REQUEST {
            log::warn!(
                "Querying {} channels in one request (API limit is {})",
                result.len(),
                MAX_LOGINS_PER_REQUEST
            );
        }

        let token = self.tokens.get_token().await?;

        let query: Vec<(&str, &str)> = result
            .entries()
            .iter()
            .map(|e| ("user_login", e.name.as_str()))
            .collect();

        log::debug!("Fetching stream status for {} channels", query.len());

        let response = self
            .client
            .get(&self.streams_url)
            .query(&query)
            .bearer_auth(&token)
            .header("Client-Id", self.tokens.client_id())
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                log::debug!("Failed to read error response body: {}", e);
                String::new()
            });
            log::error!("Streams API error: {} - {}", status, body);
            return Err(ApiError::HttpStatus {
                code: status.as_u16(),
                body: body_excerpt(&body),
            }
            .into());
        }

        let body = response.text().await.map_err(ApiError::from)?;
        let parsed: StreamsResponse = serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to parse streams response: {}", e);
            ApiError::MalformedResponse(format!("{}: {}", e, body_excerpt(&body)))
        })?;

        log::info!(
            "Streams query returned {} live streams for {} channels",
            parsed.data.len(),
            result.len()
        );

        result.apply(parsed.data);
        Ok(result)
    }
}
