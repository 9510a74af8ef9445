//! Payment provider integrations for the Souk checkout server.
//!
//! Three providers are supported: Tabby (BNPL, fixed 4 installments), Tamara (BNPL, flexible
//! installments) and Ziina (instant payments). Each client speaks its provider's native HTTP API
//! and normalizes the provider's request/response shapes and status vocabulary into the canonical
//! types in [`data_objects`], so the rest of the system never sees provider-specific payloads.
//!
//! The [`PaymentGatewayClient`] trait defines the capability set (create a checkout session,
//! verify a payment, normalize a webhook, refund). The [`Gateway`] enum dispatches over the three
//! concrete clients, and a [`GatewayRegistry`] maps gateway names to clients, rejecting unknown
//! names explicitly rather than falling back silently.
//!
//! Amounts cross the provider boundary as integer minor units (fils); no floating point currency
//! arithmetic happens anywhere in this crate.
mod client;
mod error;
mod helpers;

pub mod config;
pub mod data_objects;
pub mod tabby;
pub mod tamara;
pub mod ziina;

#[cfg(any(feature = "mock", test))]
pub mod mock;

pub use client::{Gateway, GatewayRegistry, PaymentGatewayClient};
pub use error::GatewayError;
pub use helpers::sign_payload;
pub use tabby::TabbyClient;
pub use tamara::TamaraClient;
pub use ziina::ZiinaClient;
