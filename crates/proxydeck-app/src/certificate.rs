//! CA certificate installation
//!
//! Installing is a one-shot backend action. On success the proxy section's
//! `CertInstalled` flag is persisted through the normal save path and the
//! caller is told to reload every cached view, since trust state changes are
//! not reconciled incrementally.

use proxydeck_core::prelude::*;
use proxydeck_core::CommandOutcome;
use proxydeck_daemon::Backend;

use crate::sections::ProxyEditor;

pub const INSTALL_REJECTED_MESSAGE: &str =
    "CA certificate install failed, check system permissions";

/// Result of [`ProxyEditor::install_certificate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInstall {
    pub outcome: CommandOutcome,
    /// The backend installed the certificate; cached state must be re-derived
    pub reload_required: bool,
}

impl<B: Backend + Sync + 'static> ProxyEditor<B> {
    pub async fn install_certificate(&self) -> CertificateInstall {
        let installed = match self.store().backend().install_certificate().await {
            Ok(installed) => installed,
            Err(e) => {
                error!("Certificate install failed: {}", e);
                return CertificateInstall {
                    outcome: CommandOutcome::from_error("Failed to install certificate", &e),
                    reload_required: false,
                };
            }
        };

        if !installed {
            let rejection = Error::rejected(INSTALL_REJECTED_MESSAGE);
            warn!("{}", rejection);
            return CertificateInstall {
                outcome: CommandOutcome::failure(INSTALL_REJECTED_MESSAGE),
                reload_required: false,
            };
        }

        info!("CA certificate installed");
        let saved = self.modify(|config| config.cert_installed = true).await;

        let outcome = if saved.success {
            CommandOutcome::success("CA certificate installed")
        } else {
            CommandOutcome::failure(format!(
                "CA certificate installed, but recording it failed: {}",
                saved.message
            ))
        };

        CertificateInstall {
            outcome,
            reload_required: true,
        }
    }
}
