use serde::{Deserialize, Serialize};

// Body returned with a 429
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ThrottleResponse {
    pub message: String,
    pub retry_after_ms: u64,
}

impl ThrottleResponse {
    pub fn new(retry_after_ms: u64) -> Self {
        Self {
            message: "Too many login attempts. Please try again later.".to_string(),
            retry_after_ms,
        }
    }
}
