//! Weekly leaderboard and analytics counters
//!
//! One best score per nickname, ranked within the current week (weeks start
//! Monday 00:00 UTC). Persisted to LocalStorage on wasm32, held in memory
//! natively. The game only talks to it through `ScoreSink`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BreakoutError, Result};

/// Entries shown on the public ranking
pub const MAX_RANKED: usize = 10;

/// Nickname used when the player leaves the field blank; never ranked
pub const GUEST: &str = "GUEST";

const DAY_MS: f64 = 86_400_000.0;

/// A player's best score this week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub nickname: String,
    pub score: u64,
    /// Unix timestamp (ms) of the last improvement
    pub timestamp: f64,
}

/// Tracked marketing actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    InstagramFollow,
    KakaoShare,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::InstagramFollow => "instagram_follow",
            Action::KakaoShare => "kakao_share",
        }
    }
}

/// Counters keyed by action name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub counts: BTreeMap<String, u64>,
}

impl Analytics {
    pub fn count(&self, action: Action) -> u64 {
        self.counts.get(action.as_str()).copied().unwrap_or(0)
    }

    fn bump(&mut self, action: Action) {
        *self.counts.entry(action.as_str().to_string()).or_insert(0) += 1;
    }
}

/// Where finished runs and marketing clicks go
pub trait ScoreSink {
    /// Record a final score (update-if-higher per nickname)
    fn submit_score(&mut self, nickname: &str, score: u64, now_ms: f64) -> Result<()>;
    /// Fire-and-forget counter
    fn track_action(&mut self, action: Action) -> Result<()>;
    /// This week's ranking, best first
    fn top_scores(&self, _now_ms: f64, _limit: usize) -> Vec<ScoreEntry> {
        Vec::new()
    }
    /// Every stored entry (admin view)
    fn all_scores(&self) -> Vec<ScoreEntry> {
        Vec::new()
    }
    /// Wipe scores and counters (admin)
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Start of the week (Monday 00:00 UTC) containing `now_ms`
pub fn week_start_ms(now_ms: f64) -> f64 {
    let days = (now_ms / DAY_MS).floor();
    // 1970-01-01 was a Thursday
    let since_monday = (days + 3.0).rem_euclid(7.0);
    (days - since_monday) * DAY_MS
}

/// Blank and GUEST nicknames never reach the ranking
pub fn is_rankable(nickname: &str) -> bool {
    let name = nickname.trim();
    !name.is_empty() && !name.eq_ignore_ascii_case(GUEST)
}

/// Weekly leaderboard
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: BTreeMap<String, ScoreEntry>,
    analytics: Analytics,
}

impl Leaderboard {
    /// LocalStorage keys (used only in wasm32)
    #[allow(dead_code)]
    const SCORES_KEY: &'static str = "fruit_brick_breaker_scores";
    #[allow(dead_code)]
    const ANALYTICS_KEY: &'static str = "fruit_brick_breaker_analytics";

    /// Create an empty in-memory leaderboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `score` for `nickname`. Returns true if the board changed.
    ///
    /// Entries from earlier weeks are pruned first, so a stale best never
    /// blocks this week's first score.
    pub fn record(&mut self, nickname: &str, score: u64, now_ms: f64) -> Result<bool> {
        if !is_rankable(nickname) {
            return Err(BreakoutError::IneligibleNickname(nickname.to_string()));
        }
        let name = nickname.trim();
        let week_start = week_start_ms(now_ms);
        self.entries.retain(|_, e| e.timestamp >= week_start);

        match self.entries.get_mut(name) {
            Some(entry) if score <= entry.score => Ok(false),
            Some(entry) => {
                entry.score = score;
                entry.timestamp = now_ms;
                Ok(true)
            }
            None => {
                self.entries.insert(
                    name.to_string(),
                    ScoreEntry {
                        nickname: name.to_string(),
                        score,
                        timestamp: now_ms,
                    },
                );
                Ok(true)
            }
        }
    }

    /// This week's top `limit` entries, best first (earlier wins ties)
    pub fn top(&self, now_ms: f64, limit: usize) -> Vec<&ScoreEntry> {
        let week_start = week_start_ms(now_ms);
        let mut ranked: Vec<&ScoreEntry> = self
            .entries
            .values()
            .filter(|e| e.timestamp >= week_start)
            .collect();
        sort_ranked(&mut ranked);
        ranked.truncate(limit);
        ranked
    }

    /// Every stored entry regardless of week (admin view)
    pub fn all_entries(&self) -> Vec<&ScoreEntry> {
        let mut all: Vec<&ScoreEntry> = self.entries.values().collect();
        sort_ranked(&mut all);
        all
    }

    /// 1-based rank of `nickname` this week
    pub fn rank_of(&self, nickname: &str, now_ms: f64) -> Option<usize> {
        self.top(now_ms, usize::MAX)
            .iter()
            .position(|e| e.nickname == nickname.trim())
            .map(|i| i + 1)
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// Wipe scores and analytics (admin)
    pub fn reset(&mut self) -> Result<()> {
        self.entries.clear();
        self.analytics = Analytics::default();
        log::info!("Leaderboard reset");
        self.save()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the leaderboard from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let Ok(storage) = local_storage() else {
            log::warn!("LocalStorage unavailable, leaderboard kept in memory");
            return Self::new();
        };

        let read = |key: &str| storage.get_item(key).ok().flatten();
        let entries: Vec<ScoreEntry> = read(Self::SCORES_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        let analytics: Analytics = read(Self::ANALYTICS_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        log::info!("Loaded {} leaderboard entries", entries.len());
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.nickname.clone(), e))
                .collect(),
            analytics,
        }
    }

    /// Save the leaderboard to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<()> {
        let storage = local_storage()?;
        let entries: Vec<&ScoreEntry> = self.entries.values().collect();
        let encode = |e: serde_json::Error| BreakoutError::StorageWrite(e.to_string());
        let scores = serde_json::to_string(&entries).map_err(encode)?;
        let analytics = serde_json::to_string(&self.analytics).map_err(encode)?;
        for (key, json) in [(Self::SCORES_KEY, scores), (Self::ANALYTICS_KEY, analytics)] {
            storage
                .set_item(key, &json)
                .map_err(|e| BreakoutError::StorageWrite(format!("{key}: {e:?}")))?;
        }
        Ok(())
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<()> {
        Ok(())
    }
}

fn sort_ranked(entries: &mut [&ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.timestamp.total_cmp(&b.timestamp))
    });
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Result<web_sys::Storage> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
        .ok_or_else(|| BreakoutError::StorageUnavailable("window.localStorage".to_string()))
}

impl ScoreSink for Leaderboard {
    fn submit_score(&mut self, nickname: &str, score: u64, now_ms: f64) -> Result<()> {
        if self.record(nickname, score, now_ms)? {
            log::info!("New best for {}: {}", nickname.trim(), score);
            self.save()?;
        }
        Ok(())
    }

    fn track_action(&mut self, action: Action) -> Result<()> {
        self.analytics.bump(action);
        self.save()
    }

    fn top_scores(&self, now_ms: f64, limit: usize) -> Vec<ScoreEntry> {
        self.top(now_ms, limit).into_iter().cloned().collect()
    }

    fn all_scores(&self) -> Vec<ScoreEntry> {
        self.all_entries().into_iter().cloned().collect()
    }

    fn reset(&mut self) -> Result<()> {
        Leaderboard::reset(self)
    }
}
