//! chainwatch-rpc: JSON-RPC plumbing between chainwatch and an Ethereum node.
//!
//! ```text
//! EthClient<T: RpcTransport>  implements ChainClient + BalanceFetcher
//!      └── HttpRpcClient      reqwest, per-request timeout, retry with backoff
//! ```

pub mod error;
pub mod eth;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use eth::EthClient;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
