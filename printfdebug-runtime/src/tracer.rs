//! Process-wide tracer and the scope guard.
//!
//! Each record is captured outside the lock, serialised to one buffer, and
//! written with a single `write_all` while holding the sink mutex, so lines
//! from concurrent threads never interleave.

use std::ffi::OsString;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::sink::Sink;
use crate::stack::{self, Frame, MAX_STACK_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tag {
    FuncStart,
    FuncEnd,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub tag: Tag,
    pub frames: Vec<Frame>,
}

pub struct Tracer {
    sink: Mutex<Sink>,
    max_stack: usize,
}

static GLOBAL: OnceLock<Tracer> = OnceLock::new();

impl Tracer {
    /// Tracer writing to the path named by `PRINTFDEBUG_LOG`, read on the
    /// first record.
    pub fn new() -> Self {
        Self::from_sink(Sink::from_env())
    }

    /// Tracer writing to `<prefix>.<pid>.log`.
    pub fn with_log_prefix(prefix: impl Into<OsString>) -> Self {
        Self::from_sink(Sink::with_prefix(prefix.into()))
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self::from_sink(Sink::with_writer(Box::new(writer)))
    }

    pub fn with_max_stack(mut self, max_stack: usize) -> Self {
        self.max_stack = max_stack;
        self
    }

    fn from_sink(sink: Sink) -> Self {
        Self {
            sink: Mutex::new(sink),
            max_stack: MAX_STACK_SIZE,
        }
    }

    pub fn global() -> &'static Tracer {
        GLOBAL.get_or_init(Tracer::new)
    }

    #[inline(never)]
    pub fn func_start(&self) {
        self.emit(Tag::FuncStart);
    }

    #[inline(never)]
    pub fn func_end(&self) {
        self.emit(Tag::FuncEnd);
    }

    /// Emit `funcStart` now and `funcEnd` when the guard drops, including
    /// during unwinding.
    pub fn enter(&self) -> Guard<'_> {
        self.func_start();
        Guard { tracer: self }
    }

    fn emit(&self, tag: Tag) {
        let record = Record {
            tag,
            frames: stack::capture(self.max_stack),
        };
        let Ok(mut line) = serde_json::to_vec(&record) else {
            return;
        };
        line.push(b'\n');
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .write_line(&line);
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard returned by [`Tracer::enter`]. Emits `funcEnd` on drop.
#[must_use = "dropping the guard immediately records the exit; bind it with `let _guard = ...`"]
pub struct Guard<'t> {
    tracer: &'t Tracer,
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.tracer.func_end();
    }
}
