// Adapters layer: concrete implementations of the domain ports (ledger REST API, storage, trade logs).

pub mod http;
pub mod storage;
pub mod trade_log;

pub use http::{HolofuelClient, RestClient};
pub use storage::LocalStorage;
