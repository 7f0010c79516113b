//! The remote procedure surface exposed by the backend process

use proxydeck_core::prelude::*;
use proxydeck_core::{ConfigDocument, ProcessStatus};

/// Backend RPCs the client core depends on
///
/// Every call may fail with a transport fault ([`Error::is_transport`]). A call
/// that reached the backend but was refused surfaces as
/// [`Error::Rejected`]. `install_certificate` reports an unsuccessful install
/// as `Ok(false)`, which is distinct from both.
///
/// Implement [`Backend`] (the `Send` variant) so the synchronization layer can
/// drive calls from spawned tasks.
#[trait_variant::make(Backend: Send)]
pub trait LocalBackend {
    /// Query the proxy process status
    async fn get_process_status(&self) -> Result<ProcessStatus>;

    /// Ask the backend to start the proxy process
    async fn start_process(&self) -> Result<()>;

    /// Ask the backend to stop the proxy process
    async fn stop_process(&self) -> Result<()>;

    /// Fetch the whole configuration document
    async fn get_config_document(&self) -> Result<ConfigDocument>;

    /// Replace the whole configuration document
    async fn set_config_document(&self, document: &ConfigDocument) -> Result<()>;

    /// Install the proxy CA certificate into the system trust store
    async fn install_certificate(&self) -> Result<bool>;
}
