use crate::domain::model::Trade;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Trades as CSV, one row per trade with a header.
pub fn to_csv(trades: &[Trade]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Write the trade log to `path` in `storage`.
pub async fn export<S: Storage>(storage: &S, path: &str, trades: &[Trade]) -> Result<()> {
    let data = to_csv(trades)?;
    storage.write_file(path, &data).await?;
    tracing::info!("Exported {} trades to {}", trades.len(), path);
    Ok(())
}

/// Read back a trade log written by [`export`].
pub fn from_csv(data: &[u8]) -> Result<Vec<Trade>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut trades = Vec::new();
    for record in reader.deserialize() {
        trades.push(record?);
    }
    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_layout() {
        let trades = vec![
            Trade::new("grain", Some(4.1), "USD", 60.0, 250.0, "agent B"),
            Trade::new("grain", Some(4.1), "USD", 60.0, -250.0, "agent A"),
        ];
        let data = to_csv(&trades).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("security,price,currency,time,amount,agent"));
        assert_eq!(lines.next(), Some("grain,4.1,USD,60.0,250.0,agent B"));
        assert_eq!(from_csv(&data).unwrap(), trades);
    }

    #[test]
    fn test_market_order_has_empty_price() {
        let order = Trade::new("grain", None, "USD", 0.0, 1.0, "a");
        let text = String::from_utf8(to_csv(&[order.clone()]).unwrap()).unwrap();
        assert!(text.contains("grain,,USD"));
        assert_eq!(from_csv(text.as_bytes()).unwrap(), vec![order]);
    }

    #[test]
    fn test_export_to_storage() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = crate::adapters::storage::LocalStorage::new(dir.path());
        let trades = vec![Trade::new("grain", Some(2.0), "USD", 0.0, 1.0, "buyer")];
        tokio_test::block_on(export(&storage, "trades.csv", &trades)).unwrap();
        let data = std::fs::read(dir.path().join("trades.csv")).unwrap();
        assert_eq!(from_csv(&data).unwrap(), trades);
    }
}
