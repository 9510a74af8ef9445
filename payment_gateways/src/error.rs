use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize {gateway} client: {detail}")]
    Initialization { gateway: String, detail: String },
    #[error("{gateway} request failed: {detail}")]
    Network { gateway: String, detail: String },
    #[error("{gateway} returned an error. Status {status}. {message}")]
    Api { gateway: String, status: u16, message: String },
    #[error("Could not interpret {gateway} response: {detail}")]
    ResponseFormat { gateway: String, detail: String },
    #[error("Invalid webhook signature for {0}")]
    InvalidSignature(String),
    #[error("Unknown payment gateway: {0}")]
    UnknownGateway(String),
    #[error("Invalid order data for {gateway}: {detail}")]
    InvalidOrderData { gateway: String, detail: String },
}

impl GatewayError {
    /// Classifies a reqwest transport failure. Timeouts and connection errors are "unknown
    /// outcome" conditions; the caller must not treat them as a definitive payment failure.
    pub fn from_reqwest(gateway: &str, e: reqwest::Error) -> Self {
        let detail = if e.is_timeout() { format!("timed out: {e}") } else { e.to_string() };
        GatewayError::Network { gateway: gateway.to_string(), detail }
    }

    /// True when the failure says nothing about the payment outcome (the provider may or may not
    /// have acted on the request). Callers should retry or verify later.
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, GatewayError::Network { .. })
    }
}
