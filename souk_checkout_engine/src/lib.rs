//! Souk Checkout Engine
//!
//! The core library for the Souk checkout server: session carts, stock reservation, immutable
//! order snapshots, the order state machine, and payment orchestration against the gateway
//! clients in the `payment_gateways` crate.
//!
//! The library is divided into two main sections:
//! 1. Database management ([`mod@sqlite`]). All storage behaviour is specified by the traits in
//!    [`mod@traits`]; `SqliteDatabase` is the concrete backend. You should never need to touch the
//!    database directly — use the public APIs instead. The row types in [`mod@db_types`] are
//!    public.
//! 2. The public API ([`CartApi`], [`OrderFlowApi`], [`PaymentsApi`]). These are thin, logged
//!    fronts over the storage traits; every multi-row unit of work (order creation, webhook
//!    application, cancellation) runs inside a single database transaction so a failure at any
//!    step rolls the whole operation back.
//!
//! Stock accounting is the invariant the whole crate is built around: for every SKU,
//! `0 <= reserved_quantity <= quantity_in_stock` at every committed state. Reservation happens at
//! order creation, commitment (reserved → deducted) on payment confirmation, and release on
//! cancellation of an unpaid order.
mod api;

pub mod db_types;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{CartApi, OrderFlowApi, PaymentSession, PaymentsApi, WebhookAck};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
