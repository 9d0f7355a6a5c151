//! Transactional email: verification codes and listing confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama templates. When no SMTP
//! host is configured the service is simply absent from `AppState`.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpCodeEmailHtml<'a> {
    code: &'a str,
    minutes: u64,
}

#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpCodeEmailText<'a> {
    code: &'a str,
    minutes: u64,
}

#[derive(Template)]
#[template(path = "email/product_listed.html")]
struct ProductListedEmailHtml<'a> {
    vendor_name: &'a str,
    product_name: &'a str,
    price: &'a str,
}

#[derive(Template)]
#[template(path = "email/product_listed.txt")]
struct ProductListedEmailText<'a> {
    vendor_name: &'a str,
    product_name: &'a str,
    price: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a one-time verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp_code(&self, to: &str, code: &str, minutes: u64) -> Result<(), EmailError> {
        let html = OtpCodeEmailHtml { code, minutes }.render()?;
        let text = OtpCodeEmailText { code, minutes }.render()?;

        self.send_multipart_email(to, "Your Lasu Mart verification code", &text, &html)
            .await
    }

    /// Confirm to a vendor that their product is live.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_product_listed(
        &self,
        to: &str,
        vendor_name: &str,
        product_name: &str,
        price: &str,
    ) -> Result<(), EmailError> {
        let html = ProductListedEmailHtml {
            vendor_name,
            product_name,
            price,
        }
        .render()?;
        let text = ProductListedEmailText {
            vendor_name,
            product_name,
            price,
        }
        .render()?;

        self.send_multipart_email(to, "Your product is live on Lasu Mart", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_templates_include_code_and_ttl() {
        let html = OtpCodeEmailHtml {
            code: "482913",
            minutes: 5,
        }
        .render()
        .unwrap();
        assert!(html.contains("482913"));
        assert!(html.contains("5 minutes"));

        let text = OtpCodeEmailText {
            code: "482913",
            minutes: 5,
        }
        .render()
        .unwrap();
        assert!(text.contains("482913"));
    }

    #[test]
    fn test_product_listed_template_escapes_html() {
        let html = ProductListedEmailHtml {
            vendor_name: "Ada",
            product_name: "<b>Lamp</b>",
            price: "4500.00",
        }
        .render()
        .unwrap();
        assert!(html.contains("&lt;b&gt;Lamp&lt;/b&gt;") || html.contains("&#60;b&#62;Lamp"));
        assert!(html.contains("4500.00"));
    }
}
