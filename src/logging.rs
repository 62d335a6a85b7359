//! Structured logging for the recorder.
//!
//! Every record is one JSON line with a sequence number, an RFC3339 timestamp,
//! a level and a domain. Lines go to stdout and, when `LOG_DIR` is set, are
//! also appended to `<LOG_DIR>/events.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Feed,   // Upstream fetches and snapshot decoding
    Ingest, // Poll cycles and acceptance decisions
    Store,  // Series records on disk
    Render, // Dashboard composition
    Http,   // Request handling
    System, // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Feed => "feed",
            Domain::Ingest => "ingest",
            Domain::Store => "store",
            Domain::Render => "render",
            Domain::Http => "http",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS is a comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sequence counter and optional file sink
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static EVENTS_SINK: OnceLock<Option<Mutex<BufWriter<File>>>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

fn events_sink() -> Option<&'static Mutex<BufWriter<File>>> {
    EVENTS_SINK
        .get_or_init(|| {
            let dir = PathBuf::from(std::env::var("LOG_DIR").ok()?);
            if let Err(err) = create_dir_all(&dir) {
                eprintln!("[log] failed to create log dir: {}", err);
                return None;
            }
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("events.jsonl"))
            {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to open events log: {}", err);
                    None
                }
            }
        })
        .as_ref()
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["asset", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    println!("{}", format_record(level, domain, event, fields));
}

fn format_record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let (mut top, data) = split_fields(fields);
    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("pid".to_string(), json!(process::id()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    if let Some(sink) = events_sink() {
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
    line
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_startup(endpoint: &str, data_dir: &str, bind_addr: &str, poll_secs: u64) {
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("version", v_str(env!("CARGO_PKG_VERSION"))),
            ("endpoint", v_str(endpoint)),
            ("data_dir", v_str(data_dir)),
            ("bind_addr", v_str(bind_addr)),
            ("poll_secs", json!(poll_secs)),
        ]),
    );
}

pub fn log_fatal(err: &str) {
    log(Level::Fatal, Domain::System, "fatal", obj(&[("msg", v_str(err))]));
}

pub fn log_catalog(assets: &[String]) {
    log(
        Level::Info,
        Domain::Feed,
        "catalog",
        obj(&[
            ("count", json!(assets.len())),
            ("assets", Value::Array(assets.iter().map(|a| v_str(a)).collect())),
        ]),
    );
}

pub fn log_fetch_failed(err: &str) {
    log(
        Level::Warn,
        Domain::Feed,
        "fetch_failed",
        obj(&[("msg", v_str(err))]),
    );
}

pub fn log_accepted(calculation_time: i64, written: usize, failed: usize) {
    log(
        Level::Info,
        Domain::Ingest,
        "ok",
        obj(&[
            ("calculation_time", json!(calculation_time)),
            ("written", json!(written)),
            ("failed", json!(failed)),
        ]),
    );
}

pub fn log_stale(calculation_time: i64, last_accepted: i64) {
    log(
        Level::Info,
        Domain::Ingest,
        "waiting",
        obj(&[
            ("calculation_time", json!(calculation_time)),
            ("last_accepted", json!(last_accepted)),
        ]),
    );
}

pub fn log_asset_failed(domain: Domain, asset: &str, err: &str) {
    log(
        Level::Error,
        domain,
        "asset_skipped",
        obj(&[("asset", v_str(asset)), ("msg", v_str(err))]),
    );
}

pub fn log_record_created(asset: &str) {
    log(
        Level::Debug,
        Domain::Store,
        "record_created",
        obj(&[("asset", v_str(asset))]),
    );
}

pub fn log_request(path: &str, charts: usize, elapsed_ms: f64) {
    log(
        Level::Info,
        Domain::Http,
        "dashboard",
        obj(&[
            ("path", v_str(path)),
            ("charts", json!(charts)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================
