mod diagnostics;
mod error;
mod processor;
mod report;
mod runner;
mod shim;

pub use self::{
    diagnostics::DiagnosticsCollector,
    error::{RecvError, RunError},
    processor::PacketProcessor,
    report::RunReport,
    runner::ScenarioRunner,
    shim::{Received, ShutdownHandle, Shim},
};

pub mod prelude {
    pub use super::{PacketProcessor, RecvError, RunReport, ScenarioRunner, Shim};
}
