use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;
use tracks::{LogMessage, LogProvider, LogSeverity, ProviderError};

/// Create a connected sender/receiver pair.
pub fn channel() -> (LogSender, LogReceiver) {
    let (tx, rx) = unbounded::<LogMessage>();
    (LogSender { tx }, LogReceiver { rx })
}

/// Producer side of the log feed. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct LogSender {
    tx: Sender<LogMessage>,
}

impl LogSender {
    pub fn send(&self, message: LogMessage) {
        // The receiver going away only means nobody is showing logs anymore.
        let _ = self.tx.send(message);
    }

    pub fn info(&self, text: impl Into<String>) { self.send(LogMessage::new(LogSeverity::Info, text)); }

    pub fn warning(&self, text: impl Into<String>) { self.send(LogMessage::new(LogSeverity::Warning, text)); }

    pub fn error(&self, text: impl Into<String>) { self.send(LogMessage::new(LogSeverity::Error, text)); }
}

/// Consumer side, drained once per render pass.
pub struct LogReceiver {
    rx: Receiver<LogMessage>,
}

impl LogReceiver {
    pub fn pending(&self) -> usize { self.rx.len() }
}

impl LogProvider for LogReceiver {
    fn drain_log_messages(&mut self) -> Result<Vec<LogMessage>, ProviderError> {
        Ok(self.rx.try_iter().collect())
    }
}

/// Forwards `tracing` events into the log feed so they show up in the overlay.
pub struct LogFeedLayer {
    sender: LogSender,
    min_level: Level,
}

impl LogFeedLayer {
    pub fn new(sender: LogSender) -> Self {
        Self { sender, min_level: Level::INFO }
    }

    /// Only forward events at `level` or more severe.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

impl<S: Subscriber> Layer<S> for LogFeedLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.min_level {
            return;
        }
        let severity = match level {
            Level::ERROR => LogSeverity::Error,
            Level::WARN => LogSeverity::Warning,
            _ => LogSeverity::Info,
        };
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sender.send(LogMessage::new(severity, visitor.finish()));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn receiver_drains_in_order_and_is_idempotent() {
        let (tx, mut rx) = channel();
        tx.warning("low memory");
        tx.info("ok");
        assert_eq!(rx.pending(), 2);
        let batch = rx.drain_log_messages().unwrap();
        assert_eq!(
            batch,
            vec![LogMessage::new(LogSeverity::Warning, "low memory"), LogMessage::new(LogSeverity::Info, "ok")]
        );
        assert!(rx.drain_log_messages().unwrap().is_empty());
    }

    #[test]
    fn sending_after_receiver_dropped_is_harmless() {
        let (tx, rx) = channel();
        drop(rx);
        tx.error("nobody listening");
    }

    #[test]
    fn layer_maps_levels_and_formats_fields() {
        let (tx, mut rx) = channel();
        let subscriber = tracing_subscriber::registry().with(LogFeedLayer::new(tx));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("too chatty");
            tracing::info!("catalog loaded");
            tracing::warn!(count = 3, "slow query");
            tracing::error!("device lost");
        });
        let batch = rx.drain_log_messages().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], LogMessage::new(LogSeverity::Info, "catalog loaded"));
        assert_eq!(batch[1], LogMessage::new(LogSeverity::Warning, "slow query count=3"));
        assert_eq!(batch[2].severity, LogSeverity::Error);
    }

    #[test]
    fn layer_respects_min_level() {
        let (tx, mut rx) = channel();
        let subscriber = tracing_subscriber::registry().with(LogFeedLayer::new(tx).with_min_level(Level::WARN));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });
        let batch = rx.drain_log_messages().unwrap();
        assert_eq!(batch, vec![LogMessage::new(LogSeverity::Warning, "shown")]);
    }
}
