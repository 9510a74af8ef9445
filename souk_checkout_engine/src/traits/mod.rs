//! Storage capability traits for the checkout engine.
//!
//! Backends implement one trait per concern; [`CheckoutDatabase`] bundles them for code that
//! needs the full surface. All multi-row operations are specified as atomic: a failure anywhere
//! inside them must leave the database exactly as it was.
mod cart_management;
mod catalog_management;
mod inventory_management;
mod order_management;
mod payment_management;

use payment_gateways::GatewayError;
use thiserror::Error;

pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use payment_management::{PaymentManagement, WebhookOutcome};

use crate::db_types::{OrderNumber, OrderStatusType};

/// The full backend surface for the checkout engine.
pub trait CheckoutDatabase:
    Clone + CatalogManagement + InventoryManagement + CartManagement + OrderManagement + PaymentManagement
{
    /// The URL of the database.
    fn url(&self) -> &str;
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Validation(String),
    #[error("Product not found")]
    ProductNotFound,
    #[error("Product variant not found")]
    VariantNotFound,
    #[error("This product has variants. Please specify which variant to add.")]
    VariantRequired,
    #[error("Cart not found")]
    CartNotFound,
    #[error("Cart item not found")]
    CartItemNotFound,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Order {0} not found")]
    OrderNotFound(OrderNumber),
    #[error("Payment {0} not found")]
    PaymentNotFound(String),
    #[error("{name} is out of stock")]
    OutOfStock { name: String },
    #[error("Not enough stock for {name}. Only {available} available")]
    InsufficientStock { name: String, available: i64 },
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Data constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => CheckoutError::ConstraintViolation(db.to_string()),
            _ => CheckoutError::DatabaseError(e.to_string()),
        }
    }
}

impl CheckoutError {
    /// Business-rule rejections are reported to callers verbatim; anything else is logged and
    /// replaced by a generic message at the operation boundary.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, CheckoutError::DatabaseError(_))
    }
}
