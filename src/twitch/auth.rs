//! アクセストークン管理モジュール
//!
//! Client Credentials Grant で取得したアプリアクセストークンをキャッシュし、
//! 期限切れの場合のみ `get_token()` の呼び出し時に同期的に更新する。
//! バックグラウンドでの更新タイマーは持たない。

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use super::{errors::AuthError, types::TokenResponse};
use crate::util::mask_secret;

/// Twitch OAuth2 トークンエンドポイント
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// 現在時刻（UNIX秒）の取得元
pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> i64;
}

/// システム時計
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// クライアント認証情報（プロセス中は不変）
#[derive(Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &mask_secret(&self.client_id))
            .field("client_secret", &"***")
            .finish()
    }
}

/// Bearerトークンと有効期限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at_epoch_secs: i64,
}

impl Credential {
    /// `now < expires_at` の間だけ有効
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at_epoch_secs
    }
}

/// 自動更新付きトークンキャッシュ
///
/// 更新中はロックを保持するため、共有されていても同時に走る更新は最大1つ。
pub struct TokenCache {
    client: Client,
    identity: ClientIdentity,
    token_url: String,
    credential: Mutex<Option<Credential>>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(client: Client, identity: ClientIdentity) -> Self {
        Self::with_endpoint(client, identity, TOKEN_URL, Arc::new(SystemClock))
    }

    /// エンドポイントと時計を指定して作成
    pub fn with_endpoint(
        client: Client,
        identity: ClientIdentity,
        token_url: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            identity,
            token_url: token_url.into(),
            credential: Mutex::new(None),
            clock,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.identity.client_id
    }

    /// 現在キャッシュされている認証情報（期限切れも含む）
    pub async fn cached(&self) -> Option<Credential> {
        self.credential.lock().await.clone()
    }

    /// 有効なトークンを取得
    ///
    /// キャッシュが無いか期限切れの場合のみ更新する。
    /// 更新に失敗した場合、キャッシュは変更されない。
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let mut credential = self.credential.lock().await;

        let now = self.clock.now_epoch_secs();
        match credential.as_ref() {
            Some(c) if c.is_valid_at(now) => return Ok(c.token.clone()),
            Some(c) => {
                log::debug!(
                    "Cached token expired at {} (now: {}), refreshing",
                    c.expires_at_epoch_secs,
                    now
                );
            }
            None => log::debug!("No cached token, requesting a new one"),
        }

        let renewed = self.request_new_token().await?;
        let token = renewed.token.clone();
        *credential = Some(renewed);
        Ok(token)
    }

    /// Client Credentials Grant で新しいトークンを取得
    async fn request_new_token(&self) -> Result<Credential, AuthError> {
        log::info!(
            "Requesting new app access token for client {}",
            mask_secret(&self.identity.client_id)
        );

        let form = [
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Token request failed: {}", e);
                AuthError::TransportFailure(e.to_string())
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => {
                log::error!("Could not refresh the token, received HTTP 400 (invalid client id?)");
                return Err(AuthError::InvalidClientId);
            }
            StatusCode::FORBIDDEN => {
                log::error!(
                    "Could not refresh the token, received HTTP 403 (invalid client secret?)"
                );
                return Err(AuthError::InvalidClientSecret);
            }
            status => {
                log::warn!("Token endpoint returned unexpected status: {}", status);
                return Err(AuthError::TransportFailure(format!(
                    "unexpected status {}",
                    status.as_u16()
                )));
            }
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            log::warn!("Failed to parse token response: {}", e);
            AuthError::TransportFailure(format!("malformed token response: {}", e))
        })?;

        let expires_at_epoch_secs = self
            .clock
            .now_epoch_secs()
            .checked_add(body.expires_in)
            .ok_or_else(|| {
                log::warn!("Token response has out-of-range expires_in: {}", body.expires_in);
                AuthError::TransportFailure(format!("invalid expires_in {}", body.expires_in))
            })?;
        log::info!(
            "App access token refreshed (expires in {}s)",
            body.expires_in
        );

        Ok(Credential {
            token: body.access_token,
            expires_at_epoch_secs,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// テスト用の手動時計
    #[derive(Debug)]
    pub(crate) struct ManualClock(AtomicI64);

    impl ManualClock {
        pub(crate) fn new(now: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(now)))
        }

        pub(crate) fn set(&self, now: i64) {
            self.0.store(now, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_epoch_secs(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn token_body(token: &str, expires_in: i64) -> String {
        format!(
            r#"{{"access_token":"{}","expires_in":{},"token_type":"bearer"}}"#,
            token, expires_in
        )
    }

    fn cache_for(server: &mockito::ServerGuard, clock: Arc<ManualClock>) -> TokenCache {
        TokenCache::with_endpoint(
            Client::new(),
            ClientIdentity::new("my-client-id", "my-client-secret"),
            format!("{}/oauth2/token", server.url()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_get_token_posts_client_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "my-client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "my-client-secret".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(token_body("abc", 3600))
            .expect(1)
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(1_000));
        assert_eq!(cache.get_token().await.unwrap(), "abc");
        assert_eq!(
            cache.cached().await,
            Some(Credential {
                token: "abc".to_string(),
                expires_at_epoch_secs: 4_600,
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_body("abc", 3600))
            .expect(1)
            .create_async()
            .await;

        let clock = ManualClock::new(1_000);
        let cache = cache_for(&server, clock.clone());
        assert_eq!(cache.get_token().await.unwrap(), "abc");
        clock.set(4_599);
        assert_eq!(cache.get_token().await.unwrap(), "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_body("abc", 60))
            .expect(2)
            .create_async()
            .await;

        let clock = ManualClock::new(1_000);
        let cache = cache_for(&server, clock.clone());
        cache.get_token().await.unwrap();

        // 期限ちょうどは無効
        clock.set(1_060);
        cache.get_token().await.unwrap();
        assert_eq!(cache.cached().await.unwrap().expires_at_epoch_secs, 1_120);

        cache.get_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_request_is_invalid_client_id() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"status":400,"message":"invalid client"}"#)
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(0));
        assert_eq!(cache.get_token().await, Err(AuthError::InvalidClientId));
        assert_eq!(cache.cached().await, None);
    }

    #[tokio::test]
    async fn test_forbidden_is_invalid_client_secret() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(403)
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(0));
        assert_eq!(cache.get_token().await, Err(AuthError::InvalidClientSecret));
    }

    #[tokio::test]
    async fn test_other_status_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(500)
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(0));
        assert!(matches!(
            cache.get_token().await,
            Err(AuthError::TransportFailure(msg)) if msg.contains("500")
        ));
    }

    #[tokio::test]
    async fn test_malformed_token_body_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(0));
        assert!(matches!(
            cache.get_token().await,
            Err(AuthError::TransportFailure(_))
        ));
        assert_eq!(cache.cached().await, None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        let cache = TokenCache::with_endpoint(
            Client::new(),
            ClientIdentity::new("id", "secret"),
            "http://127.0.0.1:1/oauth2/token",
            ManualClock::new(0),
        );
        assert!(matches!(
            cache.get_token().await,
            Err(AuthError::TransportFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_renewal_keeps_previous_token() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_body("first", 60))
            .create_async()
            .await;

        let clock = ManualClock::new(1_000);
        let cache = cache_for(&server, clock.clone());
        cache.get_token().await.unwrap();
        let before = cache.cached().await;
        ok.remove_async().await;

        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(403)
            .create_async()
            .await;

        clock.set(2_000);
        assert_eq!(cache.get_token().await, Err(AuthError::InvalidClientSecret));
        assert_eq!(cache.cached().await, before);
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_body("abc", i64::MAX))
            .create_async()
            .await;

        let cache = cache_for(&server, ManualClock::new(1_000));
        assert!(matches!(
            cache.get_token().await,
            Err(AuthError::TransportFailure(msg)) if msg.contains("expires_in")
        ));
        assert_eq!(cache.cached().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_renewal() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_body("shared", 3600))
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(cache_for(&server, ManualClock::new(1_000)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }
        mock.assert_async().await;
    }

    #[test]
    fn test_credential_validity_is_strict() {
        let credential = Credential {
            token: "t".to_string(),
            expires_at_epoch_secs: 100,
        };
        assert!(credential.is_valid_at(99));
        assert!(!credential.is_valid_at(100));
        assert!(!credential.is_valid_at(101));
    }

    #[test]
    fn test_identity_debug_masks_secret() {
        let identity = ClientIdentity::new("abcdefghijkl", "super-secret-value");
        let debug = format!("{:?}", identity);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("abcd***ijkl"));
    }
}
