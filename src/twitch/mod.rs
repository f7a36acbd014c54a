// =============================================================================
// Twitch Helix API連携モジュール
// =============================================================================
// 指定チャンネルが配信中かどうかを一定間隔で取得する
//
// 機能:
// - Client Credentials Grant によるアプリアクセストークンの自動更新
// - 複数チャンネルの配信状態を1リクエストでまとめて取得
// - 単発取得 / 15秒間隔の永続ポーリング
//
// 使用API: Twitch Helix Get Streams
// https://dev.twitch.tv/docs/api/reference/#get-streams
// =============================================================================

pub mod auth;
pub mod client;
pub mod errors;
pub mod poller;
pub mod types;

pub use auth::{ClientIdentity, TokenCache};
pub use client::{StreamQueryClient, StreamSource};
pub use errors::{ApiError, AuthError, PollError};
pub use poller::{PollMode, PollingEvent, PollingLoop};
pub use types::{ChannelStatus, PollResult, StreamRecord};
