//! # Souk checkout server
//! This crate hosts the HTTP front end for the checkout engine. It is responsible for:
//! * the customer-facing cart and checkout routes,
//! * order lookup and lifecycle routes for the storefront admin,
//! * payment session creation and refunds,
//! * and the inbound webhook endpoints the payment providers call.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Webhook contract
//! Providers retry deliveries based on the response status, so the webhook routes answer
//! * `200` when a delivery was accepted (including idempotent no-ops),
//! * `400` for malformed JSON or a failed signature check,
//! * `500` for internal errors — never masked as success, so the provider retries.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;
