use async_trait::async_trait;
use std::sync::Mutex;

/// Capability interface for the outbound SMS gateway.
///
/// `send_message` is fire-and-forget: delivery failures are logged by the
/// implementation, never propagated. `validate_destination` is consulted at
/// registration time; the gateway-unreachable policy (fail-open here) lives
/// in the implementation.
#[async_trait]
pub trait SmsNotifier: Send + Sync {
    async fn send_message(&self, destination: &str, body: &str);

    async fn validate_destination(&self, identifier: &str) -> bool;
}

/// Recording test double. Kept in the library so the API crate's
/// integration tests and local runs without a NOC deployment can use it.
pub struct MockSmsNotifier {
    sent: Mutex<Vec<(String, String)>>,
    valid: bool,
}

impl MockSmsNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            valid: true,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            valid: false,
        }
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock lock poisoned").len()
    }
}

impl Default for MockSmsNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsNotifier for MockSmsNotifier {
    async fn send_message(&self, destination: &str, body: &str) {
        self.sent
            .lock()
            .expect("mock lock poisoned")
            .push((destination.to_string(), body.to_string()));
    }

    async fn validate_destination(&self, _identifier: &str) -> bool {
        self.valid
    }
}
