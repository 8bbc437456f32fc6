//! Discord webhook log sink.
//!
//! A [`WebhookLayer`] turns log events into messages on an unbounded
//! channel; a tokio task drains the channel and posts each message to the
//! webhook as `{"content": "..."}`. Logging never blocks on the network.
//!
//! ```text
//!  tracing event ──▶ WebhookLayer ──mpsc──▶ delivery task ──POST──▶ Discord
//!                                              ▲
//!                          WebhookSink::flush ─┘ (waits for the backlog)
//! ```
//!
//! Only events from this crate are forwarded, so the HTTP client's own
//! logging can never feed back into the sink.

use std::fmt::{self, Write as _};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Discord rejects message content longer than this.
const DISCORD_LIMIT: usize = 2000;

const CRATE_TARGET: &str = "pdf_toolkit";

enum Message {
    Log(String),
    Flush(oneshot::Sender<()>),
}

/// Forwards events at or above `min_level` to the delivery task.
pub struct WebhookLayer {
    tx: mpsc::UnboundedSender<Message>,
    min_level: Level,
}

/// Handle kept by `main` to drain pending messages before exit.
pub struct WebhookSink {
    tx: mpsc::UnboundedSender<Message>,
}

/// Spawn the delivery task. Must be called inside a tokio runtime.
pub fn channel(url: String, min_level: Level) -> (WebhookLayer, WebhookSink) {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(deliver(url, rx));
    (
        WebhookLayer {
            tx: tx.clone(),
            min_level,
        },
        WebhookSink { tx },
    )
}

impl WebhookSink {
    /// Wait until every message logged so far has been delivered, or
    /// `timeout` elapses.
    pub async fn flush(self, timeout: Duration) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).is_err() {
            return;
        }
        let _ = tokio::time::timeout(timeout, done_rx).await;
    }
}

impl<S: Subscriber> Layer<S> for WebhookLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > self.min_level || !meta.target().starts_with(CRATE_TARGET) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let content = truncate(format!("**{}** {}", meta.level(), visitor.finish()));
        // The receiver only goes away at shutdown.
        let _ = self.tx.send(Message::Log(content));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, self.fields.trim_start())
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}

fn truncate(mut content: String) -> String {
    if content.chars().count() > DISCORD_LIMIT {
        let cut = content
            .char_indices()
            .nth(DISCORD_LIMIT - 1)
            .map_or(content.len(), |(i, _)| i);
        content.truncate(cut);
        content.push('…');
    }
    content
}

async fn deliver(url: String, mut rx: mpsc::UnboundedReceiver<Message>) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Discord webhook disabled: {e}");
            return;
        }
    };

    let mut reported = false;
    while let Some(message) = rx.recv().await {
        match message {
            Message::Log(content) => {
                let result = client
                    .post(&url)
                    .json(&serde_json::json!({ "content": content }))
                    .send()
                    .await
                    .and_then(|r| r.error_for_status());
                if let Err(e) = result {
                    if !reported {
                        eprintln!("Discord webhook delivery failed: {e}");
                        reported = true;
                    }
                }
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
