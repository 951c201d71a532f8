//! Failure reporting channel.
//!
//! Per-artifact scan failures, pack failures and unexpected errors inside
//! scheduled work are forwarded here instead of failing the operation that
//! produced them. The owning process can take the receiver to surface the
//! reports; every report is also logged, so dropping the receiver loses
//! nothing essential.

use tokio::sync::mpsc;
use tracing::warn;

/// One reported failure.
#[derive(Debug, Clone)]
pub struct FailureReport {
  pub repository: String,
  pub operation: &'static str,
  pub message: String,
}

/// Cheap-to-clone sender side of the failure stream.
#[derive(Debug, Clone)]
pub struct FailureChannel {
  tx: mpsc::UnboundedSender<FailureReport>,
}

impl FailureChannel {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<FailureReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  /// Log and forward one failure. Never blocks, never fails the caller.
  pub fn report(&self, repository: &str, operation: &'static str, message: impl std::fmt::Display) {
    let message = message.to_string();
    warn!(repository = %repository, operation = %operation, error = %message, "Indexing failure");
    // Receiver may have been dropped; the log line above is the fallback.
    let _ = self.tx.send(FailureReport {
      repository: repository.to_string(),
      operation,
      message,
    });
  }
}
