//! Background delivery of invoice emails.
//!
//! Checkout hands an [`Invoice`] to [`InvoiceMailer::enqueue`] after commit and
//! returns immediately; a single worker task drains the queue.

use tokio::sync::mpsc;

use crate::{email_client::EmailClient, invoice::Invoice};

const QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct InvoiceMailer {
    sender: Option<mpsc::Sender<Invoice>>,
}

impl InvoiceMailer {
    /// Start the worker on the current runtime.
    pub fn spawn(client: EmailClient) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_worker(client, receiver));
        Self {
            sender: Some(sender),
        }
    }

    /// A mailer that drops every job. Used when no email provider is configured.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue an invoice without waiting for delivery.
    pub fn enqueue(&self, invoice: Invoice) {
        let Some(sender) = &self.sender else {
            tracing::debug!(order_id = %invoice.order_id, "email disabled, invoice not sent");
            return;
        };
        let order_id = invoice.order_id.clone();
        if let Err(err) = sender.try_send(invoice) {
            tracing::warn!(order_id = %order_id, error = %err, "invoice email not queued");
        }
    }
}

async fn run_worker(client: EmailClient, mut receiver: mpsc::Receiver<Invoice>) {
    while let Some(invoice) = receiver.recv().await {
        let outcome = client
            .send_email(
                &invoice.recipient,
                &invoice.subject(),
                &invoice.html_body(),
                &invoice.text_body(),
            )
            .await;
        match outcome {
            Ok(()) => tracing::info!(order_id = %invoice.order_id, "invoice email sent"),
            Err(err) => {
                tracing::warn!(order_id = %invoice.order_id, error = %err, "invoice email failed")
            }
        }
    }
    tracing::debug!("invoice mailer stopped");
}
