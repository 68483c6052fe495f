use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fastmath::kernel::time::SystemClock;
use fastmath::services::attempts::{AttemptRecord, MemoryAttemptLog, SessionStats};
use fastmath::services::grid::TableGrid;
use fastmath::services::report::client::ReportClient;
use fastmath::services::report::{AnalysisPanel, AnalysisState, Report};
use fastmath::{Command, EngineConfig, ModeRequest, Reactor, SessionEvent, SessionMachine, StartRequest};

const DEFAULT_TIMER_MINUTES: u64 = 1;

/// Last transcript handed over by the dashboard.
type Transcript = Arc<Mutex<Option<(SessionStats, Vec<AttemptRecord>)>>>;

enum Line {
    Engine(Vec<Command>),
    Report,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = EngineConfig::from_env().context("loading configuration")?;
    tracing::info!("Fast Math engine booting: {:?}", config.timing);

    let transcript: Transcript = Arc::new(Mutex::new(None));
    let observer = {
        let transcript = transcript.clone();
        move |event: &SessionEvent| print_event(event, &transcript)
    };

    let machine = SessionMachine::new(
        config.clone(),
        Arc::new(SystemClock::new()),
        TableGrid::new(config.grid.clone()),
        MemoryAttemptLog::new(),
    );
    let (tx, rx) = mpsc::channel(64);
    let mut reactor = Reactor::new(rx, machine, observer);
    let shutdown = reactor.shutdown_token();
    let driver = tokio::spawn(async move { reactor.run().await });

    let client = ReportClient::new(config.report.clone())?;
    let mut panel = AnalysisPanel::new();

    println!("Commands: start <nick> <timer[:min]|free|adaptive> <tables>, <answer>, end, reset, train, ok, report, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(Line::Engine(commands)) => {
                if matches!(commands.first(), Some(Command::Start(_) | Command::Reset)) {
                    panel.reset();
                }
                for command in commands {
                    if tx.send(command).await.is_err() {
                        bail!("engine stopped unexpectedly");
                    }
                }
            }
            Ok(Line::Report) => {
                let snapshot = transcript.lock().ok().and_then(|guard| guard.clone());
                let Some((stats, rows)) = snapshot else {
                    println!("No finished session to analyse yet.");
                    continue;
                };
                println!("Analysing...");
                print_analysis(panel.analyze(&client, &rows, &stats).await);
            }
            Ok(Line::Quit) => break,
            Err(err) => println!("? {}", err),
        }
    }

    shutdown.cancel();
    drop(tx);
    driver.await?;
    Ok(())
}

fn parse_line(line: &str) -> Result<Line> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Line::Engine(Vec::new()));
    };

    let commands = match head.to_ascii_lowercase().as_str() {
        "start" => {
            let nickname = words.next().context("missing nickname")?;
            let mode = parse_mode(words.next().context("missing mode")?)?;
            let tables = parse_tables(words.next().context("missing tables")?)?;
            vec![Command::Start(StartRequest::new(nickname, tables, mode))]
        }
        "end" => vec![Command::EndSession],
        "reset" => vec![Command::Reset],
        "train" => vec![Command::BeginTraining],
        "ok" => vec![Command::AcknowledgeVictory, Command::AcknowledgeInactivity],
        "report" => return Ok(Line::Report),
        "quit" | "exit" => return Ok(Line::Quit),
        // Anything else is typed into the answer box.
        _ => vec![Command::Keystroke, Command::Submit(line.trim().to_string())],
    };
    Ok(Line::Engine(commands))
}

fn parse_mode(raw: &str) -> Result<ModeRequest> {
    let (name, minutes) = match raw.split_once(':') {
        Some((name, minutes)) => (name, Some(minutes)),
        None => (raw, None),
    };
    Ok(match name.to_ascii_lowercase().as_str() {
        "timer" => {
            let minutes = match minutes {
                Some(m) => m.parse::<u64>().with_context(|| format!("bad minutes: {m}"))?,
                None => DEFAULT_TIMER_MINUTES,
            };
            let Some(limit_ms) = minutes.checked_mul(60_000) else {
                bail!("time limit too large: {minutes} minutes");
            };
            ModeRequest::Timer { limit_ms }
        }
        "free" => ModeRequest::Free,
        "adaptive" => ModeRequest::Adaptive,
        other => bail!("unknown mode: {other}"),
    })
}

fn parse_tables(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u32>().with_context(|| format!("bad table: {t}")))
        .collect()
}

fn print_event(event: &SessionEvent, transcript: &Transcript) {
    match event {
        SessionEvent::PhaseChanged { from, to } => println!("[phase] {:?} -> {:?}", from, to),
        SessionEvent::StartRejected { reason } => println!("[start] {}", reason),
        SessionEvent::OperationLoaded { operation, .. } => println!("  {} = ?", operation),
        SessionEvent::AttemptEvaluated { metric, .. } => println!(
            "  {} ({}ms{})",
            if metric.is_correct { "correct" } else { "wrong" },
            metric.response_time_ms,
            if metric.is_timeout { ", timeout" } else { "" }
        ),
        SessionEvent::StatsUpdated { correct, wrong } => {
            println!("  score {} right / {} wrong", correct, wrong)
        }
        SessionEvent::QueueUpdated { remaining } => println!("  {} to master", remaining),
        // The clock ticks ten times a second; keep the terminal readable.
        SessionEvent::Clock(reading) => tracing::trace!("clock {:?}", reading),
        SessionEvent::HintShown { operation, answer, .. } => {
            println!("  hint: {} = {}", operation, answer)
        }
        SessionEvent::HintHidden { .. } => {}
        SessionEvent::InactivityRaised => println!("[idle] Still there? Type 'ok' to return."),
        SessionEvent::TransitionReady {
            weaknesses,
            avg_response_ms,
        } => println!(
            "[diagnosis] {} to practise, avg {:.0}ms. Type 'train'.",
            weaknesses, avg_response_ms
        ),
        SessionEvent::Victory {
            initial_weaknesses,
            training_rounds,
            hints_used,
        } => println!(
            "[victory] {} mastered in {} rounds with {} hints. Type 'ok'.",
            initial_weaknesses, training_rounds, hints_used
        ),
        SessionEvent::SessionEnded { stats, records } => {
            println!(
                "[dashboard] {} attempts, {} correct, {}% accuracy, avg {}ms. Type 'report' or 'reset'.",
                stats.total, stats.correct, stats.accuracy, stats.avg_time
            );
            if let Ok(mut slot) = transcript.lock() {
                *slot = Some((*stats, records.clone()));
            }
        }
    }
}

fn print_analysis(state: &AnalysisState) {
    match state {
        AnalysisState::Ready(Report::Prose(text)) => println!("{}", text),
        AnalysisState::Ready(Report::Structured(report)) => {
            println!("Resumen: {}", report.resumen_general);
            println!("Errores: {}", report.patron_errores);
            println!("Plan: {}", report.plan_accion);
            println!("Entrenamiento: {}", report.sugerencia_entrenamiento);
        }
        AnalysisState::Failed { message } => {
            println!("No se pudo conectar con el entrenador virtual: {}", message);
            println!("Type 'report' to retry.");
        }
        AnalysisState::Idle | AnalysisState::Loading => {}
    }
}
