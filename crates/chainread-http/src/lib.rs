//! chainread-http: HTTP JSON-RPC transport for ChainRead.

pub mod client;
pub mod dialer;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use dialer::HttpDialer;
