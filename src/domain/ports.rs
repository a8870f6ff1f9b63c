use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A Holo Fuel ledger service.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn set_limits(&self, limits: &Value) -> Result<Value>;
    async fn get_ledger_state(&self) -> Result<Value>;
}
