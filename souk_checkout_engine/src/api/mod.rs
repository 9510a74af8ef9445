mod cart_api;
mod order_flow_api;
mod payments_api;

pub use cart_api::CartApi;
pub use order_flow_api::OrderFlowApi;
pub use payments_api::{PaymentSession, PaymentsApi, WebhookAck};
