//! Email service for transactional marketplace mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. Callers
//! treat sending as best-effort: failures are logged at the call site and
//! never surfaced to the request that triggered them.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Line item summary rendered into the order confirmation email.
#[derive(Debug, Clone)]
pub struct OrderEmailLine {
    pub title: String,
    pub quantity: i32,
    pub line_total: String,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    number: &'a str,
    shop_name: &'a str,
    lines: &'a [OrderEmailLine],
    total: &'a str,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    number: &'a str,
    shop_name: &'a str,
    lines: &'a [OrderEmailLine],
    total: &'a str,
}

/// HTML template for the shop suspension notice.
#[derive(Template)]
#[template(path = "email/shop_suspended.html")]
struct ShopSuspendedHtml<'a> {
    vendor_name: &'a str,
    shop_name: &'a str,
}

/// Plain text template for the shop suspension notice.
#[derive(Template)]
#[template(path = "email/shop_suspended.txt")]
struct ShopSuspendedText<'a> {
    vendor_name: &'a str,
    shop_name: &'a str,
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
    /// Returns error if the SMTP transport cannot be constructed.
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

    /// Send an order confirmation after a payment succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or a template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        number: &str,
        shop_name: &str,
        lines: &[OrderEmailLine],
        total: &str,
    ) -> Result<(), EmailError> {
        let html = OrderConfirmationHtml {
            number,
            shop_name,
            lines,
            total,
        }
        .render()?;
        let text = OrderConfirmationText {
            number,
            shop_name,
            lines,
            total,
        }
        .render()?;

        self.send_multipart_email(to, &format!("Order {number} confirmed"), &text, &html)
            .await
    }

    /// Notify a vendor that their shop was suspended.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or a template fails to render.
    pub async fn send_shop_suspended(
        &self,
        to: &str,
        vendor_name: &str,
        shop_name: &str,
    ) -> Result<(), EmailError> {
        let html = ShopSuspendedHtml {
            vendor_name,
            shop_name,
        }
        .render()?;
        let text = ShopSuspendedText {
            vendor_name,
            shop_name,
        }
        .render()?;

        self.send_multipart_email(to, &format!("{shop_name} has been suspended"), &text, &html)
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
        Ok(())
    }
}
