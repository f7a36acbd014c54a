// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// アプリケーション全体で使用する設定値・定数と、設定ファイル（JSON）の読み書き
// =============================================================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// トークン更新・streams取得の両方で使用。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// 永続モードのポーリング間隔（秒）
pub const POLL_INTERVAL_SECS: u64 = 15;

/// 設定ファイルのデフォルトパス
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// HTTPリクエストのデフォルトタイムアウト（Duration）
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

pub fn poll_interval() -> Duration {
    Duration::from_secs(POLL_INTERVAL_SECS)
}

/// タイムアウト付きのHTTPクライアントを構築
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(http_timeout()).build()
}

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file '{path}', are you sure it's correctly formatted? ({source})")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file '{0}' already exists, refusing to overwrite it")]
    AlreadyExists(PathBuf),

    #[error(
        "a valid client id and client secret are needed to talk to the Twitch API \
         (client id specified: {client_id}, client secret specified: {client_secret})"
    )]
    MissingCredentials { client_id: bool, client_secret: bool },
}

/// 設定ファイルの内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub loop_mode: bool,
    pub streamers: Vec<String>,
}

/// コマンドラインからの上書き値
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub streamers: Option<Vec<String>>,
    pub loop_mode: bool,
}

impl AppConfig {
    /// 新規作成用テンプレート
    pub fn template() -> Self {
        Self {
            loop_mode: true,
            ..Self::default()
        }
    }

    /// ファイルから読み込む（存在しない場合はデフォルト）
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!(
            "Loaded config from {:?} ({} streamers, loop mode: {})",
            path,
            config.streamers.len(),
            config.loop_mode
        );
        Ok(config)
    }

    /// テンプレートを書き出す（既存ファイルは上書きしない）
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let json = serde_json::to_string_pretty(&Self::template()).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Config template written to {:?}", path);
        Ok(())
    }

    /// コマンドライン指定で上書き（コマンドライン > ファイル > デフォルト）
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(client_id) = overrides.client_id {
            self.client_id = client_id;
        }
        if let Some(client_secret) = overrides.client_secret {
            self.client_secret = client_secret;
        }
        if let Some(streamers) = overrides.streamers {
            self.streamers = streamers;
        }
        self.loop_mode |= overrides.loop_mode;
        self
    }

    /// 認証情報が揃っているか検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        let client_id = !self.client_id.trim().is_empty();
        let client_secret = !self.client_secret.trim().is_empty();
        if client_id && client_secret {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials {
                client_id,
                client_secret,
            })
        }
    }
}

/// セミコロン区切りのチャンネル名リストを分解（空要素は除外）
pub fn parse_streamer_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
