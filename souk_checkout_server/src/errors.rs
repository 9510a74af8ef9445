use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use payment_gateways::GatewayError;
use souk_checkout_engine::traits::CheckoutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    Checkout(#[from] CheckoutError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(e) => checkout_status_code(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internal details never leak to the caller; business-rule messages are shown verbatim.
        let message = if status.is_server_error() {
            error!("💻️ Internal error served as {status}: {self}");
            "An internal error occurred. Please try again.".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "message": message }).to_string())
    }
}

fn checkout_status_code(e: &CheckoutError) -> StatusCode {
    match e {
        CheckoutError::Validation(_) | CheckoutError::EmptyCart | CheckoutError::VariantRequired => {
            StatusCode::BAD_REQUEST
        },
        CheckoutError::ProductNotFound |
        CheckoutError::VariantNotFound |
        CheckoutError::CartNotFound |
        CheckoutError::CartItemNotFound |
        CheckoutError::OrderNotFound(_) |
        CheckoutError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::OutOfStock { .. } |
        CheckoutError::InsufficientStock { .. } |
        CheckoutError::InvalidTransition { .. } |
        CheckoutError::ConstraintViolation(_) => StatusCode::CONFLICT,
        CheckoutError::Gateway(g) => gateway_status_code(g),
        CheckoutError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn gateway_status_code(e: &GatewayError) -> StatusCode {
    match e {
        GatewayError::UnknownGateway(_) => StatusCode::BAD_REQUEST,
        GatewayError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
        GatewayError::InvalidOrderData { .. } => StatusCode::BAD_REQUEST,
        // Provider-side failures: the outcome is unknown, not the caller's fault
        GatewayError::Network { .. } |
        GatewayError::Api { .. } |
        GatewayError::ResponseFormat { .. } |
        GatewayError::Initialization { .. } => StatusCode::BAD_GATEWAY,
    }
}
