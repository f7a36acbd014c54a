use std::convert::Infallible;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;

use super::{client::StreamSource, errors::PollError, types::PollResult};
use crate::config;

/// 動作モード（起動時に1回だけ決まる）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// 1回だけ取得して終了
    SingleShot,
    /// 外部から終了されるまで一定間隔で取得し続ける
    Continuous,
}

impl PollMode {
    pub fn from_loop_flag(loop_mode: bool) -> Self {
        if loop_mode {
            PollMode::Continuous
        } else {
            PollMode::SingleShot
        }
    }
}

/// ポーリングイベント
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PollingEvent {
    /// 取得成功
    #[serde(rename = "result")]
    Result { result: PollResult },

    /// エラー発生（次の周期で再試行する）
    #[serde(rename = "error")]
    Error { message: String, kind: String },
}

impl From<&PollError> for PollingEvent {
    fn from(err: &PollError) -> Self {
        PollingEvent::Error {
            message: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

/// 配信状態ポーリングループ
pub struct PollingLoop<S> {
    source: S,
    mode: PollMode,
    interval: Duration,
}

impl<S: StreamSource> PollingLoop<S> {
    pub fn new(source: S, mode: PollMode) -> Self {
        Self {
            source,
            mode,
            interval: config::poll_interval(),
        }
    }

    #[cfg(test)]
    fn with_interval(source: S, mode: PollMode, interval: Duration) -> Self {
        Self {
            source,
            mode,
            interval,
        }
    }

    pub fn mode(&self) -> PollMode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 起動時のモードに従って実行する
    ///
    /// SingleShot は成功時に結果を1回通知して戻り、失敗はそのまま返す。
    /// Continuous は戻らない。
    pub async fn run<F>(&self, channels: &[String], mut event_callback: F) -> Result<(), PollError>
    where
        F: FnMut(PollingEvent),
    {
        match self.mode {
            PollMode::SingleShot => {
                let result = self.run_single_shot(channels).await?;
                event_callback(PollingEvent::Result { result });
                Ok(())
            }
            PollMode::Continuous => match self.run_continuous(channels, event_callback).await {},
        }
    }

    /// 1回だけ取得する（エラーはそのまま呼び出し元へ）
    pub async fn run_single_shot(&self, channels: &[String]) -> Result<PollResult, PollError> {
        self.source.query_streams(channels).await
    }

    /// 永続ループ
    ///
    /// どの種類のエラーでも停止せず、イベントとして通知して続行する。
    /// プロセスの終了以外で戻ることはない。
    pub async fn run_continuous<F>(&self, channels: &[String], mut event_callback: F) -> Infallible
    where
        F: FnMut(PollingEvent),
    {
        log::info!(
            "Continuous polling started for {} channels (interval: {:?})",
            channels.len(),
            self.interval
        );

        loop {
            self.run_iteration(channels, &mut event_callback).await;
        }
    }

    /// 1周期分：取得して通知し、成否に関わらず必ず1回だけ待機する
    pub async fn run_iteration<F>(&self, channels: &[String], event_callback: &mut F)
    where
        F: FnMut(PollingEvent),
    {
        match self.source.query_streams(channels).await {
            Ok(result) => {
                log::debug!(
                    "Poll succeeded: {}/{} channels live",
                    result.live_count(),
                    result.len()
                );
                event_callback(PollingEvent::Result { result });
            }
            Err(e) => {
                log::warn!("Polling error, retrying in {:?}: {}", self.interval, e);
                event_callback(PollingEvent::from(&e));
            }
        }

        // 試行の終了から計測
        sleep(self.interval).await;
    }
}
