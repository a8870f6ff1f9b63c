use anyhow::Result;
use holofuel::adapters::trade_log;
use holofuel::model::near;
use holofuel::utils::validation::Validate;
use holofuel::{LocalStorage, SimulationConfig};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn reserve_config(output: &str) -> String {
    format!(
        r#"
[simulation]
name = "issue"
description = "One buyer issuing Holo Fuel from a reserve"

[world]
start = 0.0
duration = 120.0
quanta = 60.0

[venue]
kind = "reserve"
name = "HoloFuel/USD"
reserves = [{{ price = 0.0005, amount = 500.0 }}]

[venue.issuance]
available = 1000.0
book_value = 0.001

[[actors]]
identity = "buyer"
balance = 10.0
start = 0.0
quanta = 60.0

[[actors.needs]]
priority = 1
deadline = 60.0
security = "HoloFuel"
cycle = 600.0
amount = 100.0

[output]
path = "{}"
trades_csv = "runs/issue.csv"
"#,
        output
    )
}

#[tokio::test]
async fn test_simulate_and_export_trades() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_string_lossy().replace('\\', "/");

    let mut config_file = NamedTempFile::new()?;
    config_file.write_all(reserve_config(&output).as_bytes())?;
    let config = SimulationConfig::from_file(config_file.path())?;
    config.validate()?;

    let mut engine = config.build_engine()?;
    let report = engine.run()?;
    assert_eq!(report.periods, 2);

    // Close to its deadline, the buyer bids over the issue price and is
    // filled at its own limit; a cycle later it bids under and waits.
    assert_eq!(report.trades.len(), 2);
    let bought = &report.trades[0];
    assert_eq!(bought.agent, "buyer");
    assert_eq!(bought.amount, 100.0);
    assert!(near(bought.price.unwrap_or_default(), 0.001035));
    let buyer = engine.agent("buyer").unwrap().account();
    assert_eq!(buyer.holds("HoloFuel"), 100.0);
    assert!(near(buyer.balance(), 10.0 - 0.1035));
    assert_eq!(engine.venue.open("buyer").len(), 1);
    let book = engine.venue.to_string();
    assert!(book.contains("Reserve: 500 Fuel @ Price of 0.00050 USD"));
    // Issued at the reserve's ask, whatever the buyer paid.
    assert!(book.contains("Reserve: 100 Fuel @ Price of 0.00100 USD"), "{}", book);

    let storage = LocalStorage::new(config.output_path());
    let path = config.trades_csv().unwrap_or("trades.csv");
    trade_log::export(&storage, path, &report.trades).await?;

    let written = std::fs::read(temp_dir.path().join("runs/issue.csv"))?;
    let trades = trade_log::from_csv(&written)?;
    assert_eq!(trades, report.trades);
    assert_eq!(trades[1].agent, "HoloFuel/USD Reserve");
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let err = SimulationConfig::from_file("no/such/simulation.toml").unwrap_err();
    assert!(matches!(err, holofuel::HoloFuelError::IoError(_)));
    assert_eq!(err.severity(), holofuel::utils::error::ErrorSeverity::Critical);
}
