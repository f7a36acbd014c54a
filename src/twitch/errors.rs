use thiserror::Error;

/// レスポンスボディの抜粋の最大文字数
const BODY_EXCERPT_CHARS: usize = 200;

/// トークン更新（client credentials grant）のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token refresh rejected with HTTP 400 - the client id is most likely invalid")]
    InvalidClientId,

    #[error("token refresh rejected with HTTP 403 - the client secret is most likely invalid")]
    InvalidClientSecret,

    #[error("token refresh failed: {0}")]
    TransportFailure(String),
}

/// Streams APIのエラー
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("streams API returned HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("malformed streams response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// 1回のポーリングで起こり得るエラー
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PollError {
    /// イベント通知用のエラー種別
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Auth(AuthError::InvalidClientId) => "invalidClientId",
            PollError::Auth(AuthError::InvalidClientSecret) => "invalidClientSecret",
            PollError::Auth(AuthError::TransportFailure(_)) => "authTransport",
            PollError::Api(ApiError::HttpStatus { .. }) => "httpStatus",
            PollError::Api(ApiError::MalformedResponse(_)) => "malformedResponse",
            PollError::Api(ApiError::Transport(_)) => "transport",
        }
    }
}

/// ボディを先頭から最大200文字に切り詰める（文字境界を保つ）
pub fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
