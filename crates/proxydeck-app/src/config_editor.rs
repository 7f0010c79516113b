//! Generic editor for one section of the shared configuration document
//!
//! Each editor keeps a typed local view of its own section. `load` projects
//! the section out of a fresh fetch. `save` goes through
//! [`DocumentStore::update`], so the section is merged into the document as
//! it is at write time, never into the copy seen by the last `load`. After a
//! successful write the local view is set to the saved value directly.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use proxydeck_core::prelude::*;
use proxydeck_core::{CommandOutcome, ConfigDocument};
use proxydeck_daemon::Backend;

use crate::document_store::DocumentStore;

/// A section of [`ConfigDocument`] that an editor owns
pub trait Section: Send + Sync + 'static {
    type Value: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Short name used in messages and events
    const NAME: &'static str;

    /// Read the section, substituting defaults for anything absent
    fn project(document: &ConfigDocument) -> Self::Value;

    /// Write `value` into the section, synthesizing it when absent
    fn apply(document: &mut ConfigDocument, value: &Self::Value);

    fn saved_message() -> String {
        format!("{} settings saved", capitalize(Self::NAME))
    }

    fn save_failed_message() -> String {
        format!("Failed to save {} settings", Self::NAME)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct ConfigEditor<B, S: Section> {
    store: Arc<DocumentStore<B>>,
    view_tx: watch::Sender<S::Value>,
    loaded: AtomicBool,
    _section: PhantomData<S>,
}

impl<B, S: Section> ConfigEditor<B, S> {
    /// Current local view of the section
    pub fn value(&self) -> S::Value {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S::Value> {
        self.view_tx.subscribe()
    }

    /// `true` once the view came from the backend rather than defaults
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Replace the local view without touching the backend
    pub fn set_local(&self, value: S::Value) {
        self.view_tx.send_replace(value);
    }

    /// Discard the local view, falling back to the section defaults
    pub fn invalidate(&self) {
        self.loaded.store(false, Ordering::SeqCst);
        self.view_tx
            .send_replace(S::project(&ConfigDocument::default()));
    }
}

impl<B: Backend + Sync + 'static, S: Section> ConfigEditor<B, S> {
    /// Editor starting from the section defaults
    pub fn new(store: Arc<DocumentStore<B>>) -> Self {
        let (view_tx, _) = watch::channel(S::project(&ConfigDocument::default()));
        Self {
            store,
            view_tx,
            loaded: AtomicBool::new(false),
            _section: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore<B>> {
        &self.store
    }

    /// Fetch the document and project this section into the local view
    ///
    /// On failure the previous view is kept. The document is never written.
    pub async fn load(&self) -> CommandOutcome {
        match self.store.load().await {
            Ok(document) => {
                let value = S::project(&document);
                debug!("Loaded {} section: {:?}", S::NAME, value);
                self.view_tx.send_replace(value);
                self.loaded.store(true, Ordering::SeqCst);
                CommandOutcome::success(format!("Loaded {} settings", S::NAME))
            }
            Err(e) => {
                warn!("Failed to load {} settings: {}", S::NAME, e);
                CommandOutcome::from_error(&format!("Failed to load {} settings", S::NAME), &e)
            }
        }
    }

    /// Persist `value` as this section
    pub async fn save(&self, value: S::Value) -> CommandOutcome {
        self.modify(move |current| *current = value).await
    }

    /// Persist a change to this section as it currently stands in the backend
    ///
    /// `change` sees the section projected from the document fetched at write
    /// time. Fields it leaves alone keep the backend's values.
    pub async fn modify<F>(&self, change: F) -> CommandOutcome
    where
        F: FnOnce(&mut S::Value) + Send,
    {
        let result = self
            .store
            .update(|document| {
                let mut value = S::project(document);
                change(&mut value);
                S::apply(document, &value);
                value
            })
            .await;

        match result {
            Ok((_, value)) => {
                info!("Saved {} settings", S::NAME);
                self.view_tx.send_replace(value);
                self.loaded.store(true, Ordering::SeqCst);
                CommandOutcome::success(S::saved_message())
            }
            Err(e) => {
                error!("{}: {}", S::save_failed_message(), e);
                CommandOutcome::from_error(&S::save_failed_message(), &e)
            }
        }
    }
}
