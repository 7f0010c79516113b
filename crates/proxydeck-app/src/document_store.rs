//! Read-modify-write access to the shared configuration document
//!
//! The backend offers no versioned or conditional write, so every update
//! re-fetches the whole document immediately before writing it back. That
//! narrows the lost-update window to the gap between the two calls; it does
//! not close it for writers in other processes.
//!
//! Within this process, updates are serialized by an async mutex, so two
//! editors sharing one store never overwrite each other.

use std::sync::Arc;

use tokio::sync::Mutex;

use proxydeck_core::prelude::*;
use proxydeck_core::ConfigDocument;
use proxydeck_daemon::Backend;

pub struct DocumentStore<B> {
    backend: Arc<B>,
    write_lock: Mutex<()>,
}

impl<B: Backend + Sync + 'static> DocumentStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Fetch the current document; does not wait for in-flight updates
    pub async fn load(&self) -> Result<ConfigDocument> {
        self.backend.get_config_document().await
    }

    /// Fetch the document, apply `edit`, and write the whole document back
    ///
    /// Returns the document as written, with `edit`'s own result.
    pub async fn update<T, F>(&self, edit: F) -> Result<(ConfigDocument, T)>
    where
        F: FnOnce(&mut ConfigDocument) -> T + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut document = self
            .backend
            .get_config_document()
            .await
            .context("fetching config before write")?;
        let output = edit(&mut document);
        self.backend
            .set_config_document(&document)
            .await
            .context("writing config")?;

        Ok((document, output))
    }
}
