//! Email delivery service.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use memehub_common::{AppError, AppResult, config::EmailSettings};
use serde::Serialize;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";
const SITE_NAME: &str = "MemeHub";

/// How outgoing mail leaves the process.
#[derive(Clone)]
enum Transport {
    /// SMTP relay through lettre.
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Brevo transactional email HTTP API.
    Brevo { api_key: String },
    /// Nothing configured: log the message instead of sending it.
    Log,
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Serialize)]
struct BrevoContact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoRequest<'a> {
    sender: BrevoContact<'a>,
    to: Vec<BrevoContact<'a>>,
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
}

/// Email service.
#[derive(Clone)]
pub struct EmailService {
    transport: Transport,
    from_address: String,
    from_name: String,
    site_url: String,
    http_client: reqwest::Client,
}

impl EmailService {
    /// Build the service from configuration. SMTP wins over Brevo when both
    /// are set.
    pub fn from_settings(settings: &EmailSettings, site_url: &str) -> AppResult<Self> {
        let transport = if let Some(smtp) = &settings.smtp {
            let builder = if smtp.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            }
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay {}: {e}", smtp.host)))?;

            Transport::Smtp(
                builder
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ))
                    .build(),
            )
        } else if let Some(api_key) = settings.brevo_api_key.clone().filter(|k| !k.is_empty()) {
            Transport::Brevo { api_key }
        } else {
            Transport::Log
        };

        Ok(Self {
            transport,
            from_address: settings.from_address.clone(),
            from_name: settings.from_name.clone(),
            site_url: site_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    /// Name of the active transport.
    #[must_use]
    pub const fn transport_name(&self) -> &'static str {
        match self.transport {
            Transport::Smtp(_) => "smtp",
            Transport::Brevo { .. } => "brevo",
            Transport::Log => "log",
        }
    }

    /// Public base URL used in links.
    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Send an email.
    pub async fn send(&self, message: EmailMessage) -> AppResult<()> {
        match &self.transport {
            Transport::Smtp(mailer) => self.send_smtp(mailer, message).await,
            Transport::Brevo { api_key } => self.send_brevo(api_key, message).await,
            Transport::Log => {
                tracing::info!(
                    to = %message.to,
                    subject = %message.subject,
                    body = %message.text_body,
                    "Email transport not configured, logging message"
                );
                Ok(())
            }
        }
    }

    /// Send the email-verification message with a link to `verify_url`.
    pub async fn send_verification(&self, to: &str, name: &str, verify_url: &str) -> AppResult<()> {
        let message = self.verification_message(to, name, verify_url);
        self.send(message).await?;
        tracing::info!(%to, transport = self.transport_name(), "Verification email sent");
        Ok(())
    }

    /// Render the email-verification message.
    #[must_use]
    pub fn verification_message(&self, to: &str, name: &str, verify_url: &str) -> EmailMessage {
        let subject = format!("Verify your email on {SITE_NAME}");
        let text_body = format!(
            "Hi {name},\n\n\
            Please verify your email address for your {SITE_NAME} account.\n\n\
            Open the following link to verify:\n{verify_url}\n\n\
            The link expires in 24 hours. If you didn't create an account, you can ignore this email."
        );
        let html_body = self.wrap_html(&format!(
            "<p>Hi {name},</p>\
            <p>Please verify your email address for your {SITE_NAME} account.</p>\
            <p><a href=\"{verify_url}\" style=\"display:inline-block;padding:12px 24px;background:#7c3aed;color:#fff;text-decoration:none;border-radius:4px;\">Verify Email</a></p>\
            <p><small>The link expires in 24 hours. If you didn't create an account, you can ignore this email.</small></p>"
        ));

        EmailMessage {
            to: to.to_string(),
            subject,
            text_body,
            html_body,
        }
    }

    /// Wrap HTML content in a basic email template.
    fn wrap_html(&self, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        a {{ color: #7c3aed; }}
    </style>
</head>
<body>
    {content}
    <hr style="margin-top: 40px; border: none; border-top: 1px solid #e9ecef;">
    <p style="font-size: 12px; color: #6c757d;">
        This email was sent from <a href="{url}">{SITE_NAME}</a>.
    </p>
</body>
</html>"#,
            url = self.site_url
        )
    }

    async fn send_smtp(
        &self,
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        message: EmailMessage,
    ) -> AppResult<()> {
        let from = Mailbox::new(
            Some(self.from_name.clone()),
            self.from_address
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid sender address: {e}")))?,
        );
        let to = Mailbox::new(
            None,
            message
                .to
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {e}")))?,
        );

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject)
            .multipart(MultiPart::alternative_plain_html(
                message.text_body,
                message.html_body,
            ))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;

        mailer
            .send(email)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP delivery failed: {e}")))?;
        Ok(())
    }

    async fn send_brevo(&self, api_key: &str, message: EmailMessage) -> AppResult<()> {
        let body = BrevoRequest {
            sender: BrevoContact {
                email: &self.from_address,
                name: Some(&self.from_name),
            },
            to: vec![BrevoContact {
                email: &message.to,
                name: None,
            }],
            subject: &message.subject,
            html_content: &message.html_body,
            text_content: &message.text_body,
        };

        let response = self
            .http_client
            .post(BREVO_SEND_URL)
            .header("api-key", api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Brevo request failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(AppError::ExternalService(format!(
                "Brevo returned {status}: {error_text}"
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use memehub_common::config::SmtpSettings;

    fn settings() -> EmailSettings {
        EmailSettings {
            from_address: "noreply@memehub.test".to_string(),
            from_name: "MemeHub".to_string(),
            smtp: None,
            brevo_api_key: None,
        }
    }

    #[test]
    fn test_transport_selection() {
        let service = EmailService::from_settings(&settings(), "https://memehub.test").unwrap();
        assert_eq!(service.transport_name(), "log");

        let mut brevo = settings();
        brevo.brevo_api_key = Some("xkeysib-123".to_string());
        let service = EmailService::from_settings(&brevo, "https://memehub.test").unwrap();
        assert_eq!(service.transport_name(), "brevo");

        let mut smtp = brevo;
        smtp.smtp = Some(SmtpSettings {
            host: "smtp-relay.brevo.com".to_string(),
            port: 587,
            username: "user".to_string(),
            password: "pass".to_string(),
        });
        let service = EmailService::from_settings(&smtp, "https://memehub.test").unwrap();
        assert_eq!(service.transport_name(), "smtp");
    }

    #[test]
    fn test_empty_brevo_key_falls_back_to_log() {
        let mut s = settings();
        s.brevo_api_key = Some(String::new());

        let service = EmailService::from_settings(&s, "https://memehub.test").unwrap();
        assert_eq!(service.transport_name(), "log");
    }

    #[test]
    fn test_verification_message() {
        let service = EmailService::from_settings(&settings(), "https://memehub.test/").unwrap();
        let url = "https://memehub.test/auth/verify-email?token=abc";

        let message = service.verification_message("alice@example.com", "alice", url);

        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.subject, "Verify your email on MemeHub");
        assert!(message.text_body.contains(url));
        assert!(message.html_body.contains(&format!("href=\"{url}\"")));
        assert!(message.html_body.contains("href=\"https://memehub.test\""));
    }

    #[tokio::test]
    async fn test_log_transport_sends() {
        let service = EmailService::from_settings(&settings(), "https://memehub.test").unwrap();

        service
            .send_verification("alice@example.com", "alice", "https://memehub.test/x")
            .await
            .unwrap();
    }
}
