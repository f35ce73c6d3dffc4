pub mod error;
pub mod rest;
pub mod rpc;

pub use error::{ApiError, ErrorBody};
pub use rest::{GatewayState, create_router};
pub use rpc::{price_router, rank_router};
