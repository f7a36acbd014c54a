use serde::{Deserialize, Serialize};

/// 配信中のチャンネル情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub viewer_count: u64, // → viewerCount
    pub title: String,
    pub started_at: String, // → startedAt（APIのタイムスタンプ文字列そのまま）
}

/// 1チャンネル分のポーリング結果
///
/// `stream` が `None` の場合はオフライン
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub name: String,
    pub stream: Option<StreamRecord>,
}

impl ChannelStatus {
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }
}

/// 1回のポーリング結果
///
/// 要求されたチャンネル名を要求順に1件ずつ保持する。
/// 名前の照合は大文字小文字を区別しない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollResult {
    entries: Vec<ChannelStatus>,
}

impl PollResult {
    /// 要求された全チャンネルをオフラインとして初期化
    ///
    /// 大文字小文字違いの重複は最初の表記だけを残す
    pub fn offline(channel_names: &[String]) -> Self {
        let mut entries: Vec<ChannelStatus> = Vec::with_capacity(channel_names.len());
        for name in channel_names {
            if entries.iter().any(|e| e.name.eq_ignore_ascii_case(name)) {
                log::debug!("Ignoring duplicate channel name: {}", name);
                continue;
            }
            entries.push(ChannelStatus {
                name: name.clone(),
                stream: None,
            });
        }
        Self { entries }
    }

    /// APIが返した配信データを反映する
    ///
    /// 要求されていない名前は無視する
    pub fn apply(&mut self, streams: Vec<StreamData>) {
        for data in streams {
            match self
                .entries
                .iter_mut()
                .find(|e| data.matches_login(&e.name))
            {
                Some(entry) => {
                    entry.stream = Some(StreamRecord {
                        viewer_count: data.viewer_count,
                        title: data.title,
                        started_at: data.started_at,
                    });
                }
                None => {
                    log::debug!("Ignoring unrequested stream in response: {}", data.user_name);
                }
            }
        }
    }

    pub fn entries(&self) -> &[ChannelStatus] {
        &self.entries
    }

    /// チャンネル名で検索（大文字小文字を区別しない）
    pub fn get(&self, name: &str) -> Option<&ChannelStatus> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.get(name).is_some_and(ChannelStatus::is_live)
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Twitch API レスポンス型
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamData {
    /// 表示名（ログイン名と異なる場合がある）
    pub user_name: String,
    #[serde(default)]
    pub user_login: Option<String>,
    pub viewer_count: u64,
    pub title: String,
    pub started_at: String,
}

impl StreamData {
    /// 要求されたチャンネル名と一致するか（表示名・ログイン名のどちらでも可）
    pub fn matches_login(&self, name: &str) -> bool {
        self.user_name.eq_ignore_ascii_case(name)
            || self
                .user_login
                .as_deref()
                .is_some_and(|login| login.eq_ignore_ascii_case(name))
    }
}
