//! Post-session coaching report.
//!
//! The engine hands over a finished transcript and never waits on this layer. Failures
//! stay here as a retryable `AnalysisState::Failed`.

pub mod client;
pub mod prompt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use self::client::{ReportClient, ReportError};
use self::prompt::{build_prompt, format_transcript};
use crate::services::attempts::{AttemptRecord, SessionStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    #[serde(default)]
    pub resumen_general: String,
    #[serde(default)]
    pub patron_errores: String,
    #[serde(default)]
    pub plan_accion: String,
    #[serde(default)]
    pub sugerencia_entrenamiento: String,
}

impl StructuredReport {
    fn is_complete(&self) -> bool {
        [
            &self.resumen_general,
            &self.patron_errores,
            &self.plan_accion,
            &self.sugerencia_entrenamiento,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Prose(String),
    Structured(StructuredReport),
}

impl Report {
    /// Structured when the text is the four-field JSON object (optionally fenced).
    pub fn from_text(text: &str) -> Self {
        let body = strip_fence(text.trim());
        match serde_json::from_str::<StructuredReport>(body) {
            Ok(report) if report.is_complete() => Report::Structured(report),
            _ => Report::Prose(text.trim().to_string()),
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnalysisState {
    #[default]
    Idle,
    Loading,
    Ready(Report),
    Failed {
        message: String,
    },
}

/// Dashboard-side holder for the report request.
#[derive(Debug, Default)]
pub struct AnalysisPanel {
    state: AnalysisState,
}

impl AnalysisPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn begin(&mut self) {
        self.state = AnalysisState::Loading;
    }

    pub fn complete(&mut self, result: Result<String, ReportError>) {
        self.state = match result {
            Ok(text) => AnalysisState::Ready(Report::from_text(&text)),
            Err(err) => {
                warn!("Report failed: {}", err);
                AnalysisState::Failed {
                    message: err.to_string(),
                }
            }
        };
    }

    /// Runs one request. Callable again after a failure.
    pub async fn analyze(
        &mut self,
        client: &ReportClient,
        rows: &[AttemptRecord],
        stats: &SessionStats,
    ) -> &AnalysisState {
        self.begin();
        let prompt = build_prompt(&format_transcript(rows, stats), client.structured());
        let result = client.generate(&prompt).await;
        self.complete(result);
        if matches!(self.state, AnalysisState::Ready(_)) {
            info!("Report ready");
        }
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = AnalysisState::Idle;
    }
}
