//! Structured JSON-lines logging.
//!
//! Every record is one JSON object on stderr:
//! `{ts, run_id, seq, lvl, component, event, msg, view?, date?, data}`.
//! When `LOG_DIR` is set the same lines are appended to
//! `<LOG_DIR>/<run_id>/events.jsonl` (trace/debug go to `trace.jsonl`).
//!
//! Filtering:
//! - `LOG_LEVEL`: trace | debug | info | warn | error | fatal (default info)
//! - `LOG_DOMAINS`: comma-separated domain list, or `all` (default)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Minimum level from `LOG_LEVEL`, read once per process.
    pub fn from_env() -> Self {
        static MIN: OnceLock<Level> = OnceLock::new();
        *MIN.get_or_init(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Level::Info)
        })
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

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal]
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log level: {}", s))
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Fetch,    // Backend requests and responses
    Index,    // Dataset indexing
    Playback, // Clock start/stop
    View,     // Controller state transitions
    Export,   // CSV output
    System,   // Startup, shutdown, config
    Profile,  // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Fetch => "fetch",
            Domain::Index => "index",
            Domain::Playback => "playback",
            Domain::View => "view",
            Domain::Export => "export",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        domain_filter().map_or(true, |allowed| allowed.iter().any(|d| d == self.as_str()))
    }
}

/// `None` means every domain is enabled.
fn parse_domains(raw: Option<&str>) -> Option<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(list) => Some(
            list.split(',')
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        ),
    }
}

fn domain_filter() -> Option<&'static [String]> {
    static FILTER: OnceLock<Option<Vec<String>>> = OnceLock::new();
    FILTER
        .get_or_init(|| parse_domains(std::env::var("LOG_DOMAINS").ok().as_deref()))
        .as_deref()
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct FileSinks {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    files: Option<FileSinks>,
}

fn open_sinks(base: &str, run_id: &str) -> Option<FileSinks> {
    let mut run_dir = PathBuf::from(base);
    run_dir.push(run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }
    let open = |name: &str| match File::create(run_dir.join(name)) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", name, err);
            None
        }
    };
    Some(FileSinks {
        events: open("events.jsonl")?,
        trace: open("trace.jsonl")?,
    })
}

fn run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let files = std::env::var("LOG_DIR")
            .ok()
            .and_then(|base| open_sinks(&base, &run_id));
        RunContext { run_id, files }
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["view", "date", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain.as_str(), event, fields);
}

/// Wire shape of one log line. `top` carries the lifted `view`/`date` keys.
#[derive(Serialize)]
struct Record<'a> {
    ts: String,
    run_id: &'a str,
    seq: u64,
    lvl: String,
    component: &'a str,
    event: &'a str,
    msg: Value,
    #[serde(flatten)]
    top: Map<String, Value>,
    data: Map<String, Value>,
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = run_context();
    let (mut top, data) = split_fields(fields);
    let record = Record {
        ts: ts_now(),
        run_id: &ctx.run_id,
        seq: next_seq(),
        lvl: level.as_str().to_ascii_uppercase(),
        component,
        event,
        msg: top.remove("msg").unwrap_or_else(|| v_str("")),
        top,
        data,
    };
    let Ok(line) = serde_json::to_string(&record) else {
        return;
    };
    if let Some(files) = &ctx.files {
        let sink = if level <= Level::Debug { &files.trace } else { &files.events };
        write_line(sink, &line);
    }
    eprintln!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_fetch_issued(view: &str, seq: u64, date: &str) {
    log(
        Level::Info,
        Domain::Fetch,
        "daily_fetch",
        obj(&[
            ("view", v_str(view)),
            ("date", v_str(date)),
            ("request_seq", json!(seq)),
        ]),
    );
}

pub fn log_dataset_applied(view: &str, date: &str, day_type: &str, records: usize, fingerprint: &str) {
    log(
        Level::Info,
        Domain::View,
        "dataset_applied",
        obj(&[
            ("view", v_str(view)),
            ("date", v_str(date)),
            ("day_type", v_str(day_type)),
            ("records", json!(records)),
            ("fingerprint", v_str(fingerprint)),
        ]),
    );
}

pub fn log_fetch_failed(view: &str, date: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Fetch,
        "daily_fetch_failed",
        obj(&[
            ("view", v_str(view)),
            ("date", v_str(date)),
            ("msg", v_str(error)),
        ]),
    );
}

pub fn log_stale_response(view: &str, seq: u64, latest: u64) {
    log(
        Level::Debug,
        Domain::Fetch,
        "stale_response_dropped",
        obj(&[
            ("view", v_str(view)),
            ("request_seq", json!(seq)),
            ("latest_seq", json!(latest)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed time as a trace record on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warn));
        assert_eq!(" trace ".parse::<Level>(), Ok(Level::Trace));
        assert!("verbose".parse::<Level>().is_err());
        assert!(Level::Debug < Level::Info && Level::Error < Level::Fatal);
    }

    #[test]
    fn domain_list_parsing() {
        assert_eq!(parse_domains(None), None);
        assert_eq!(parse_domains(Some("all")), None);
        assert_eq!(
            parse_domains(Some("Fetch, playback,,")),
            Some(vec!["fetch".to_string(), "playback".to_string()])
        );
    }

    #[test]
    fn index_domain_is_filterable() {
        assert_eq!(Domain::Index.as_str(), "index");
        let only_index = parse_domains(Some("index")).unwrap();
        assert!(only_index.iter().any(|d| d == Domain::Index.as_str()));
        assert!(!only_index.iter().any(|d| d == Domain::Profile.as_str()));
    }

    #[test]
    fn obj_keeps_insertion_order() {
        let m = obj(&[("z", v_str("last")), ("a", v_num(1.5))]);
        assert_eq!(m.keys().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(m["a"], 1.5);
    }

    #[test]
    fn view_date_and_msg_move_to_top_level() {
        let (top, data) = split_fields(obj(&[
            ("view", v_str("secondary")),
            ("date", v_str("2021-03-15")),
            ("msg", v_str("loaded")),
            ("records", v_num(3.0)),
        ]));
        assert_eq!(top.len(), 3);
        assert_eq!(top["date"], "2021-03-15");
        assert_eq!(data.keys().collect::<Vec<_>>(), ["records"]);
    }

    #[test]
    fn sequence_is_monotonic() {
        let first = next_seq();
        assert!(next_seq() > first);
    }
}
