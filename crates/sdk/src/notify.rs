//! User-facing notifications
//!
//! Every mutation reports exactly once, either a success message or the
//! error that ended it.

use dexloan_types::DexloanError;
use tracing::{error, info};

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, error: &DexloanError);
}

/// Emits notifications as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(target: "dexloan_sdk::notify", "{}", message);
    }

    fn error(&self, err: &DexloanError) {
        error!(target: "dexloan_sdk::notify", error = %err, "{}", err.user_message());
    }
}
