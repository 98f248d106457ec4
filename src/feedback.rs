//! フィードバック優先度付きキュー
//!
//! UIに見せるキューを有界に保つためのストア。バッチごとに高重大度(≥4)と
//! 中重大度(2〜3)を各1件までしか受理せず、プロデューサがバーストしても
//! キューの成長率が抑えられる。期限切れ(TTL 4000ms)は遅延評価で、
//! 次の読み書き時に掃除される。
//!
//! 書き込みは単一のMutexで直列化されるため、バッチ受理上限は
//! プロデューサ単位ではなくグローバルに効く。

use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;

/// アイテムの生存時間
pub const FEEDBACK_TTL_MS: u64 = 4000;

/// 重大度 (1〜5)。境界で検証し、ストア内部には不正値を持ち込まない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Severity(u8);

impl Severity {
    /// 成功・情報
    pub const INFO: Severity = Severity(1);
    /// 注意喚起
    pub const WARNING: Severity = Severity(3);
    /// 安全に関わるエラー
    pub const ERROR: Severity = Severity(5);

    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn is_high(self) -> bool {
        self.0 >= 4
    }

    fn is_mid(self) -> bool {
        (2..=3).contains(&self.0)
    }
}

/// 投入されるキュー（受理前）
#[derive(Debug, Clone)]
pub struct FeedbackCue {
    pub severity: Severity,
    pub message: String,
}

impl FeedbackCue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// アクティブなフィードバックアイテム。作成後は期限切れ削除以外で変化しない。
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub created_at_ms: u64,
}

/// 単調増加するミリ秒時刻源。テストでは偽のクロックを注入する。
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Instantベースの単調クロック
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

struct Inner {
    items: Vec<FeedbackItem>,
    next_id: u64,
}

/// 呼び出し側が所有するフィードバックストア
///
/// single-writer / multiple-reader。エラーは返さない設計で、
/// 不正な重大度は`Severity::new`の段階で弾かれている。
pub struct FeedbackStore<C: Clock = MonotonicClock> {
    inner: Mutex<Inner>,
    clock: C,
    ttl_ms: u64,
}

impl FeedbackStore<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }

    /// TTLを設定から取るストア
    pub fn from_config(config: &crate::config::FeedbackConfig) -> Self {
        Self::new().with_ttl(config.ttl_ms)
    }
}

impl Default for FeedbackStore<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FeedbackStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: Vec::new(),
                next_id: 0,
            }),
            clock,
            ttl_ms: FEEDBACK_TTL_MS,
        }
    }

    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// キューのバッチを投入する。
    ///
    /// 受理規則: 高重大度(≥4)はバッチ内の最初の1件のみ、中重大度(2〜3)も
    /// 最初の1件のみ。重大度1（成功・情報）は件数制限なし。
    pub fn push(&self, batch: &[FeedbackCue]) {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().expect("feedback store poisoned");
        Self::expire(&mut inner, now, self.ttl_ms);

        let high = batch.iter().find(|c| c.severity.is_high());
        let mid = batch.iter().find(|c| c.severity.is_mid());
        let infos = batch.iter().filter(|c| c.severity.get() == 1);

        let mut admitted = 0usize;
        for cue in high.into_iter().chain(mid).chain(infos) {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.items.push(FeedbackItem {
                id,
                severity: cue.severity,
                message: cue.message.clone(),
                created_at_ms: now,
            });
            admitted += 1;
        }
        debug!(submitted = batch.len(), admitted, "feedback batch");
    }

    /// アクティブなアイテムを挿入順（古い順）で返す
    pub fn snapshot(&self) -> Vec<FeedbackItem> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().expect("feedback store poisoned");
        Self::expire(&mut inner, now, self.ttl_ms);
        inner.items.clone()
    }

    /// 即時に全消去する。猶予期間はない。
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("feedback store poisoned");
        inner.items.clear();
    }

    fn expire(inner: &mut Inner, now_ms: u64, ttl_ms: u64) {
        let before = inner.items.len();
        inner
            .items
            .retain(|item| now_ms.saturating_sub(item.created_at_ms) < ttl_ms);
        let dropped = before - inner.items.len();
        if dropped > 0 {
            debug!(dropped, "feedback items expired");
        }
    }
}
