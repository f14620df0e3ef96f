//! Call stack capture.

use serde::{Deserialize, Serialize};

/// Frame cap per record.
pub const MAX_STACK_SIZE: usize = 1024;

/// One resolved stack frame. Inlined calls yield one frame each, sharing
/// the `PC` of the physical frame they were inlined into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Frame {
    #[serde(rename = "PC")]
    pub pc: u64,
    pub function: String,
    pub file: String,
    pub line: u32,
    /// Start address of the function, 0 when unknown.
    pub entry: u64,
}

/// Frames from the caller of the tracing entry point outwards, at most
/// `cap` of them.
pub(crate) fn capture(cap: usize) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut skipping = true;
    backtrace::trace(|raw| {
        let pc = raw.ip() as u64;
        let mut symbols = Vec::new();
        backtrace::resolve_frame(raw, |symbol| {
            symbols.push(Frame {
                pc,
                function: symbol
                    .name()
                    .map(|name| format!("{name:#}"))
                    .unwrap_or_default(),
                file: symbol
                    .filename()
                    .map(|f| f.display().to_string())
                    .unwrap_or_default(),
                line: symbol.lineno().unwrap_or(0),
                entry: symbol.addr().map_or(0, |addr| addr as u64),
            });
        });
        if symbols.is_empty() {
            symbols.push(Frame {
                pc,
                function: String::new(),
                file: String::new(),
                line: 0,
                entry: raw.symbol_address() as u64,
            });
        }

        for frame in symbols {
            if skipping && is_library_frame(&frame.function) {
                continue;
            }
            skipping = false;
            if frames.len() == cap {
                return false;
            }
            frames.push(frame);
        }
        frames.len() < cap
    });
    frames
}

/// Frames belonging to this crate or to the unwinder, which sit innermost
/// on every captured stack.
fn is_library_frame(function: &str) -> bool {
    #[cfg(test)]
    {
        if tests::is_unit_test_frame(function) {
            return false;
        }
    }
    function.starts_with("backtrace::")
        || function.starts_with("_Unwind")
        || function.contains("printfdebug_runtime::")
}
