use anyhow::Context;
use clap::Parser;
use holofuel::adapters::trade_log;
use holofuel::core::World;
use holofuel::domain::ports::LedgerApi;
use holofuel::model::natural;
use holofuel::model::trading::Agent;
use holofuel::utils::error::{ErrorSeverity, HoloFuelError};
use holofuel::utils::{logger, validation::Validate};
use holofuel::{Cli, Command, HolofuelClient, LocalStorage, RestClient, SimulationConfig};
use serde_json::Value;

enum Outcome {
    Report(String),
    Json(Value),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting holofuel CLI");
    tracing::debug!("CLI config: {:?}", cli);

    match execute(&cli).await {
        Ok(Outcome::Report(report)) => println!("{}", report),
        Ok(Outcome::Json(value)) => {
            let text = serde_json::to_string_pretty(&value).context("rendering ledger response")?;
            println!("{}", text);
        }
        Err(e) => {
            tracing::error!(
                "❌ holofuel failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn client(endpoint: Option<&str>) -> HolofuelClient {
    match endpoint {
        Some(endpoint) => HolofuelClient::new(RestClient::new([endpoint])),
        None => HolofuelClient::default(),
    }
}

async fn execute(cli: &Cli) -> holofuel::Result<Outcome> {
    match &cli.command {
        Command::Simulate {
            config,
            trades_csv,
            dry_run,
        } => {
            let config = SimulationConfig::from_file(config)?;
            config.validate()?;
            simulate(&config, trades_csv.as_deref(), *dry_run).await
        }
        Command::LedgerState { endpoint } => {
            let state = client(endpoint.as_deref()).get_ledger_state().await?;
            Ok(Outcome::Json(state))
        }
        Command::SetLimits { endpoint, data } => {
            let text = match data.strip_prefix('@') {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => data.clone(),
            };
            let limits: Value = serde_json::from_str(&text)?;
            let response = client(endpoint.as_deref()).set_limits(&limits).await?;
            Ok(Outcome::Json(response))
        }
    }
}

async fn simulate(
    config: &SimulationConfig,
    trades_csv: Option<&str>,
    dry_run: bool,
) -> holofuel::Result<Outcome> {
    let mut engine = config.build_engine()?;
    if dry_run {
        return Ok(Outcome::Report(format!(
            "✅ {} is valid: {} agents, starting {}",
            config.simulation.name,
            engine.agents.len(),
            engine.world.format_now(engine.world.start(), false)
        )));
    }

    let report = engine.run()?;
    if report.periods == 0 {
        return Err(HoloFuelError::SimulationError {
            message: "the world was already done; nothing was simulated".to_string(),
        });
    }

    if let Some(path) = trades_csv.or(config.trades_csv()) {
        let storage = LocalStorage::new(config.output_path());
        trade_log::export(&storage, path, &report.trades).await?;
    }

    let mut agents: Vec<_> = engine.agents.iter().map(|a| a.account()).collect();
    agents.sort_by_key(|a| natural(&a.identity));

    let mut lines = vec![format!(
        "✅ {}: {} periods, {} trades",
        config.simulation.name,
        report.periods,
        report.trades.len()
    )];
    for account in agents {
        let assets: Vec<String> = account
            .assets
            .iter()
            .map(|(security, amount)| format!("{} {}", amount, security))
            .collect();
        lines.push(format!(
            "{:<20} {}${:9.4}  {}",
            account.identity,
            account.currency.as_deref().unwrap_or(""),
            account.balance(),
            assets.join(", ")
        ));
    }
    lines.push(engine.venue.to_string());
    Ok(Outcome::Report(lines.join("\n")))
}
