//! AEGIS replay binary
//!
//! `aegis-detect [FILE]` reads newline-delimited JSON events from FILE (or
//! stdin when omitted or `-`), streams them through an `EventProcessor`, then
//! runs the batch detectors over the whole set.
//!
//! Incidents and detections go to stdout as JSON lines; logs go to stderr.

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use aegis_detect::constants::{APP_NAME, APP_VERSION};
use aegis_detect::logic::event::{read_jsonl, IngestBatch};
use aegis_detect::{DetectResult, DetectionEngine, EngineConfig, Event, SignatureStore};

const CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("{} v{} starting...", APP_NAME, APP_VERSION);

    let path = std::env::args().nth(1);
    let batch = match load(path.as_deref()) {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("[Main] Cannot read {}: {}", path.as_deref().unwrap_or("stdin"), e);
            return ExitCode::FAILURE;
        }
    };

    match run(batch).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[Main] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(path: Option<&str>) -> io::Result<IngestBatch> {
    match path {
        Some(p) if p != "-" => Ok(read_jsonl(BufReader::new(File::open(p)?))),
        _ => Ok(read_jsonl(io::stdin().lock())),
    }
}

async fn run(batch: IngestBatch) -> DetectResult<()> {
    let engine = DetectionEngine::new(Arc::new(SignatureStore::with_defaults()), EngineConfig::from_env())?;
    log::info!("[Main] Loaded {} events ({} skipped)", batch.events.len(), batch.skipped);

    stream(&engine, batch.events.clone()).await?;

    for event in &batch.events {
        if let Some(findings) = engine.check_anomaly(event) {
            log::warn!("[Main] Anomaly at ts {}: {}", event.timestamp, findings);
        }
        engine.add_event(event.clone());
    }

    for detection in engine.analyze_behavior(&batch.events) {
        println!("{}", serde_json::to_string(&detection)?);
    }
    for incident in engine.batch_anomalies(&batch.events) {
        println!("{}", serde_json::to_string(&incident)?);
    }

    let score = engine.score_ai_pattern(&batch.events);
    if score.is_match {
        eprintln!("{}", score.report());
    }
    println!("{}", serde_json::to_string(&score)?);
    println!("{}", serde_json::to_string(&engine.detection_summary())?);

    Ok(())
}

/// Feed every event through a fresh processor and print its incidents.
/// Returns once the processor has drained the closed inbound channel.
async fn stream(engine: &DetectionEngine, events: Vec<Event>) -> DetectResult<()> {
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (incident_tx, mut incident_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut processor = engine.event_processor(event_rx, incident_tx);
    let task = tokio::spawn(async move { processor.start().await });

    let feeder = tokio::spawn(async move {
        for event in events {
            if event_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    while let Some(incident) = incident_rx.recv().await {
        println!("{}", serde_json::to_string(&incident)?);
    }

    if let Err(e) = feeder.await {
        log::error!("[Main] Feeder task failed: {}", e);
    }
    match task.await {
        Ok(result) => result,
        Err(e) => {
            log::error!("[Main] Processor task failed: {}", e);
            Ok(())
        }
    }
}
