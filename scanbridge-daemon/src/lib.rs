//! Scheduler runtime: service wiring, the pass loop, signals and tracing.

mod error;
mod runtime;
pub mod wiring;

pub use error::DaemonError;
pub use runtime::{
    init_tracing, run, run_once, shutdown_signal, start_blocking, Scheduler, SchedulerConfig,
};
pub use wiring::{connect_sink, Services, SinkMode};
