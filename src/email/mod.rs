pub mod templates;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::Batch;

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_welcome(
        &self,
        to_email: &str,
        to_name: &str,
        tenant_name: Option<&str>,
        base_url: &str,
    ) -> Result<(), String> {
        let html = templates::render_welcome(to_name, tenant_name, base_url);
        self.send(to_email, "Bienvenido a Screener", &html).await
    }

    pub async fn send_batch_processed(
        &self,
        to_email: &str,
        to_name: &str,
        batch: &Batch,
        base_url: &str,
    ) -> Result<(), String> {
        let status = batch.status().map(|s| s.label()).unwrap_or("Actualizado");
        let html = templates::render_batch_processed(
            to_name,
            &batch.file_name,
            status,
            batch.notes.as_deref(),
            base_url,
        );
        self.send(
            to_email,
            &format!("Lote {} - {}", batch.file_name, status),
            &html,
        )
        .await
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}
