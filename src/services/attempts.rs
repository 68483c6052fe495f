use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::kernel::state::Mode;

pub const CSV_HEADER: [&str; 9] = [
    "timestamp",
    "nickname",
    "game_mode",
    "factor_a",
    "factor_b",
    "user_input",
    "correct_result",
    "is_correct",
    "response_time",
];

/// One row of the learner's transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub nickname: String,
    pub game_mode: Mode,
    pub factor_a: u32,
    pub factor_b: u32,
    /// `None` for operations that timed out.
    pub user_input: Option<i64>,
    pub correct_result: i64,
    pub is_correct: bool,
    pub response_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub correct: usize,
    /// Rounded mean response time in ms.
    pub avg_time: u64,
    /// Rounded percentage.
    pub accuracy: u32,
}

/// Append-only attempt log.
pub trait AttemptLog {
    fn begin(&mut self, nickname: &str);
    fn record_attempt(
        &mut self,
        row: u32,
        col: u32,
        user_input: Option<i64>,
        is_correct: bool,
        response_time_ms: u64,
        mode: Mode,
    );
    fn session_stats(&self) -> SessionStats;
    fn export_rows(&self) -> Vec<AttemptRecord>;
    fn reset_session(&mut self);
}

#[derive(Debug, Default)]
pub struct MemoryAttemptLog {
    nickname: String,
    records: Vec<AttemptRecord>,
}

impl MemoryAttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AttemptLog for MemoryAttemptLog {
    fn begin(&mut self, nickname: &str) {
        self.nickname = nickname.to_string();
        self.records.clear();
    }

    fn record_attempt(
        &mut self,
        row: u32,
        col: u32,
        user_input: Option<i64>,
        is_correct: bool,
        response_time_ms: u64,
        mode: Mode,
    ) {
        self.records.push(AttemptRecord {
            timestamp: Utc::now(),
            nickname: self.nickname.clone(),
            game_mode: mode,
            factor_a: row,
            factor_b: col,
            user_input,
            correct_result: i64::from(row) * i64::from(col),
            is_correct,
            response_time: response_time_ms,
        });
    }

    fn session_stats(&self) -> SessionStats {
        stats_for(&self.records)
    }

    fn export_rows(&self) -> Vec<AttemptRecord> {
        self.records.clone()
    }

    fn reset_session(&mut self) {
        self.nickname.clear();
        self.records.clear();
    }
}

pub fn stats_for(records: &[AttemptRecord]) -> SessionStats {
    let total = records.len();
    if total == 0 {
        return SessionStats::default();
    }
    let correct = records.iter().filter(|r| r.is_correct).count();
    let time: u64 = records.iter().map(|r| r.response_time).sum();
    SessionStats {
        total,
        correct,
        avg_time: (time as f64 / total as f64).round() as u64,
        accuracy: (correct as f64 * 100.0 / total as f64).round() as u32,
    }
}

/// Renders the transcript with the fixed header. Booleans are written as 1/0.
pub fn to_csv(records: &[AttemptRecord]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for r in records {
        let fields = [
            r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            csv_field(&r.nickname),
            r.game_mode.as_str().to_string(),
            r.factor_a.to_string(),
            r.factor_b.to_string(),
            r.user_input.map(|v| v.to_string()).unwrap_or_default(),
            r.correct_result.to_string(),
            u8::from(r.is_correct).to_string(),
            r.response_time.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
