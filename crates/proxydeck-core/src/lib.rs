//! # proxydeck-core - Core Domain Types
//!
//! Foundation crate for proxydeck. Provides domain types, error handling and
//! logging setup shared by the backend client and the synchronization layer.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Status (`status`)
//! - [`ProcessStatus`] - Backend-owned proxy process snapshot
//! - [`StatusView`] - Displayable projection with formatted uptime
//! - [`format_uptime()`] - `HH:MM:SS` formatting
//!
//! ### Configuration document (`document`)
//! - [`ConfigDocument`] - The shared document, with unknown content preserved
//! - [`ProxyConfig`], [`UiConfig`], [`GeneralConfig`], [`LogConfig`] - Typed section views
//! - [`document::defaults`] - Per-section default values
//!
//! ### Notifications (`notification`)
//! - [`Notification`], [`Severity`]
//!
//! ### Error Handling (`error`, `outcome`)
//! - [`Error`] - Error enum with transport / rejection classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`CommandOutcome`] - `{success, message}` returned to the UI layer
//!
//! ## Prelude
//!
//! ```rust
//! use proxydeck_core::prelude::*;
//! ```

pub mod document;
pub mod error;
pub mod logging;
pub mod notification;
pub mod outcome;
pub mod prelude;
pub mod status;

pub use document::{
    is_known_close_action, is_known_theme, ConfigDocument, GeneralConfig, GeneralSection,
    LogConfig, LogSection, ProxyConfig, ProxySection, UiConfig, UiSection, CLOSE_ACTIONS, THEMES,
};
pub use error::{Error, Result, ResultExt};
pub use notification::{Notification, Severity, DEFAULT_NOTIFICATION_DURATION};
pub use outcome::CommandOutcome;
pub use status::{format_uptime, ProcessStatus, ProxyMode, StatusView};
