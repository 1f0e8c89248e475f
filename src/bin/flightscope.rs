use clap::Parser;
use flightscope::chat::ChatEngine;
use flightscope::heuristics::DetectionConfig;
use flightscope::ingest::{self, IngestLimits};
use flightscope::memory::ConversationMemory;
use flightscope::store::{JsonFileStore, MemoryStore};
use flightscope::summary::FlightRecord;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Once;

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

#[derive(Parser, Debug)]
#[command(name = "flightscope", version, about = "Flight-log telemetry analysis")]
struct Cli {
    /// Decoded-telemetry JSONL files, one message per line.
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Directory for the conversation-memory store (defaults to the platform
    /// data dir).
    #[arg(long = "memory-dir")]
    memory_dir: Option<PathBuf>,

    /// Run one chat turn against the first analyzed flight and print the
    /// outcome.
    #[arg(long = "chat")]
    chat: Option<String>,

    /// Print proactive suggestions for the first analyzed flight.
    #[arg(long = "suggest", default_value_t = false)]
    suggest: bool,

    /// Evict sessions idle past the retention window, then exit.
    #[arg(long = "cleanup", default_value_t = false)]
    cleanup: bool,

    /// Session retention window in days.
    #[arg(long = "retention-days", default_value_t = 30)]
    retention_days: i64,

    /// Message-count ceiling for a single log.
    #[arg(long = "max-messages", default_value_t = 1_000_000)]
    max_messages: usize,

    /// Emit channel data alongside the summary.
    #[arg(long = "full", default_value_t = false)]
    full: bool,
}

fn analyze_file(path: &PathBuf, limits: &IngestLimits, cfg: &DetectionConfig) -> anyhow::Result<FlightRecord> {
    ingest::check_source_file(path, limits)?;
    let reader = BufReader::new(File::open(path)?);
    let messages = ingest::read_decoded_jsonl(reader)?;
    let record = FlightRecord::from_messages(messages, limits, cfg, None)?;
    Ok(record)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    if atty::is(atty::Stream::Stdout) {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    init_parallelism();
    let cli = Cli::parse();

    let store: Box<dyn MemoryStore> = match &cli.memory_dir {
        Some(dir) => Box::new(JsonFileStore::new(dir.clone())),
        None => Box::new(JsonFileStore::default_location()?),
    };
    let memory = ConversationMemory::load(store).with_retention_days(cli.retention_days);

    if cli.cleanup {
        let mut memory = memory;
        let removed = memory.cleanup_old_sessions();
        println!("{}", serde_json::json!({ "evicted_sessions": removed }));
        return Ok(());
    }

    let limits = IngestLimits { max_messages: cli.max_messages, ..Default::default() };
    let cfg = DetectionConfig::default();

    // Flights are independent; analyze them in parallel.
    let mut records: Vec<(usize, FlightRecord)> = cli
        .input
        .par_iter()
        .enumerate()
        .map(|(i, path)| {
            analyze_file(path, &limits, &cfg).map(|r| (i, r)).map_err(|e| {
                anyhow::anyhow!("{}: {e}", path.display())
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by_key(|(i, _)| *i);

    let engine = ChatEngine::new(memory, None);
    for (_, record) in &records {
        engine.cache_flight(record.clone());
    }

    for (_, record) in &records {
        if cli.full {
            print_json(record)?;
        } else {
            print_json(&serde_json::json!({
                "flight_id": record.flight_id,
                "total_messages": record.total_messages,
                "message_types": record.message_types,
                "summary": record.summary,
            }))?;
        }
    }

    let first = records.first().map(|(_, r)| r);
    if let (Some(record), Some(message)) = (first, cli.chat.as_deref()) {
        let outcome = engine.process_message(message, Some(&record.flight_id));
        print_json(&outcome)?;
    }
    if let Some(record) = first {
        if cli.suggest {
            let suggestions = engine
                .memory()
                .proactive_suggestions(&record.flight_id, &record.summary);
            print_json(&suggestions)?;
        }
    }

    Ok(())
}
