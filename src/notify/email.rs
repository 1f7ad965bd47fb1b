//! Email channel: authenticated SMTP submission.
//!
//! Sends an HTML-framed message over STARTTLS with the configured
//! credentials. SMTP 5xx responses and malformed addresses are
//! permanent (retrying cannot help); connection failures and 4xx
//! responses are transient.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ChannelError, ChannelKind, ChannelTransport, RenderedMessage};
use crate::config::SmtpConfig;

/// Transport sending notification emails over SMTP.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    recipient: String,
}

impl EmailChannel {
    /// Builds the channel from SMTP settings.
    ///
    /// Address validity is checked per-send, not here, so a bad
    /// recipient surfaces as a permanent delivery failure rather than
    /// a startup error.
    pub fn new(smtp: &SmtpConfig) -> Result<EmailChannel, ChannelError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| ChannelError::permanent(format!("SMTP relay setup: {e}")))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
            .build();

        Ok(EmailChannel {
            transport,
            from: smtp.from.clone(),
            recipient: smtp.recipient.clone(),
        })
    }

    /// Builds the MIME message, rejecting malformed addresses as permanent.
    fn build_message(&self, message: &RenderedMessage) -> Result<Message, ChannelError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| ChannelError::permanent(format!("invalid sender address: {e}")))?;
        let to: Mailbox = self
            .recipient
            .parse()
            .map_err(|e| ChannelError::permanent(format!("invalid recipient address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(html_body(message))
            .map_err(|e| ChannelError::permanent(format!("message construction: {e}")))
    }
}

#[async_trait]
impl ChannelTransport for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, message: &RenderedMessage) -> Result<(), ChannelError> {
        let email = self.build_message(message)?;

        match self.transport.send(email).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_permanent() => {
                Err(ChannelError::permanent(format!("SMTP rejected delivery: {e}")))
            }
            Err(e) => Err(ChannelError::transient(format!("SMTP send failed: {e}"))),
        }
    }
}

/// Frames the body as a small HTML document: heading, message with
/// newlines as breaks, and a sender footer.
fn html_body(message: &RenderedMessage) -> String {
    format!(
        "<html>\n<body>\n<h2>{}</h2>\n\
         <div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\n{}\n</div>\n\
         <hr>\n<p style=\"color: #666; font-size: 12px;\">Sent by AutoPRX</p>\n\
         </body>\n</html>",
        message.subject,
        message.body.replace('\n', "<br>")
    )
}
