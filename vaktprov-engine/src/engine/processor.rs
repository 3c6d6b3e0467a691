//! Defines the PacketProcessor trait implemented by named programs under test.

use async_trait::async_trait;

use crate::engine::shim::Shim;

#[async_trait]
pub trait PacketProcessor: Send + Sync {
    /// Name used to select the processor, e.g. on the command line.
    fn name(&self) -> &str;

    /// Runs the program against the shim until it returns. Returning
    /// `RecvError::Shutdown` as an error counts as a clean return.
    async fn run(&self, shim: Shim) -> anyhow::Result<()>;
}
