use std::collections::VecDeque;
use std::io::Write;

use serde::Serialize;

pub const LOG_CAPACITY: usize = 12;

// =============================================================================
// Status snapshot
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PartyStatus {
    pub name: String,
    pub type_label: &'static str,
    pub level: u8,
    pub hp: u16,
    pub max_hp: u16,
}

/// Derived view of the adapter state for the dashboard. Recomputed fresh
/// every step; holds no authoritative state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub steps: u64,
    pub total_reward: f64,
    pub cookies: u64,
    pub bonks: u64,
    pub objective: &'static str,
    pub badge_count: u32,
    pub level_cap: u8,
    pub map_id: u8,
    pub x: u8,
    pub y: u8,
    pub phase: &'static str,
    pub party: Vec<PartyStatus>,
    pub graveyard: Vec<String>,
    pub last_policy_update: u64,
}

// =============================================================================
// Log buffer
// =============================================================================

/// Bounded log-line store, drop-oldest. Never back-pressures the step loop.
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Abstract sink for per-step telemetry. Implementations must not block;
/// write errors are swallowed, never surfaced into the step loop.
pub trait TelemetrySink {
    fn emit(&mut self, status: &StatusSnapshot, line: Option<&str>);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&mut self, _status: &StatusSnapshot, _line: Option<&str>) {}
}

/// JSONL sink: one object per step with the status snapshot and the log line
/// appended that step, if any.
pub struct WriterSink<W: Write> {
    writer: W,
}

#[derive(Serialize)]
struct SinkRecord<'a> {
    #[serde(flatten)]
    status: &'a StatusSnapshot,
    log: Option<&'a str>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TelemetrySink for WriterSink<W> {
    fn emit(&mut self, status: &StatusSnapshot, line: Option<&str>) {
        let record = SinkRecord { status, log: line };
        if serde_json::to_writer(&mut self.writer, &record).is_ok() {
            let _ = self.writer.write_all(b"\n");
        }
    }
}
