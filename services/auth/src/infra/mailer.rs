use tracing::info;

use crate::domain::repository::Mailer;

/// Mailer that records deliveries in the log instead of sending them.
///
/// Only the recipient and message kind are logged; the code or token itself never is.
/// Swap in an SMTP-backed [`Mailer`] for production delivery.
#[derive(Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send_verification_code(&self, to: &str, _code: &str) -> anyhow::Result<()> {
        info!(to, kind = "email_verification", "mail dispatched");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _token: &str) -> anyhow::Result<()> {
        info!(to, kind = "password_reset", "mail dispatched");
        Ok(())
    }
}
