// REST clients for the two external systems of record. Neither system
// offers batching; every operation is an independent round-trip with a
// bounded timeout.
pub mod order_backend;
pub mod payment_gateway;

pub use order_backend::OrderBackendClient;
pub use payment_gateway::{GatewayPaymentMethod, PaymentGatewayClient, PaymentIntent};
