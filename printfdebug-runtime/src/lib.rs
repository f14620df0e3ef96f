//! Entry/exit trace log for instrumented programs.
//!
//! Every call appends one JSON line holding a tag (`funcStart` or `funcEnd`)
//! and the caller's stack:
//!
//! ```text
//! {"tag":"funcStart","frames":[{"PC":..,"Function":"app::work","File":"src/main.rs","Line":12,"Entry":..}]}
//! ```
//!
//! Lines go to `$PRINTFDEBUG_LOG.<pid>.log`, or to stderr when the variable
//! is unset or empty. The file is opened on the first call and appended to.

mod sink;
mod stack;
mod tracer;

pub use sink::{log_path, LOG_ENV};
pub use stack::{Frame, MAX_STACK_SIZE};
pub use tracer::{Guard, Record, Tag, Tracer};

/// Record entry into the calling function.
pub fn func_start() {
    Tracer::global().func_start();
}

/// Record exit from the calling function.
pub fn func_end() {
    Tracer::global().func_end();
}

/// Record entry now and exit when the returned guard drops.
pub fn enter() -> Guard<'static> {
    Tracer::global().enter()
}
