use crate::adapters::http::{HolofuelClient, RestClient, DEFAULT_BASE};
use crate::core::engine::Engine;
use crate::core::world::{bounded, RealtimeWorld, SteppedWorld, World};
use crate::domain::model::Need;
use crate::model::reserve::{Issuance, Reserve};
use crate::model::trading::{Actor, Agent, Exchange, Market, Producer, Venue};
use crate::model::{DAY, HOUR, MINUTE};
use crate::utils::error::{HoloFuelError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_path, validate_positive, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub simulation: SimulationSection,
    #[serde(default)]
    pub world: WorldConfig,
    pub venue: VenueConfig,
    #[serde(default)]
    pub actors: Vec<ActorConfig>,
    pub api: Option<ApiConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldKind {
    #[default]
    Stepped,
    Realtime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub kind: WorldKind,
    pub start: Option<f64>,
    pub duration: Option<f64>,
    pub quanta: Option<f64>,
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Market,
    Exchange,
    Reserve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub kind: VenueKind,
    /// `"Security/Currency"` for a market or reserve, `"Exchange/Currency"` for an exchange.
    pub name: String,
    pub currency: Option<String>,
    pub identity: Option<String>,
    #[serde(default)]
    pub reserves: Vec<TrancheConfig>,
    pub issuance: Option<IssuanceConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrancheConfig {
    pub price: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IssuanceConfig {
    pub available: f64,
    pub period: Option<f64>,
    pub ratio: Option<f64>,
    pub factor: Option<f64>,
    pub premium: Option<f64>,
    pub book_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    pub identity: String,
    pub currency: Option<String>,
    pub balance: Option<f64>,
    pub minimum: Option<f64>,
    pub start: Option<f64>,
    pub quanta: Option<f64>,
    #[serde(default)]
    pub assets: BTreeMap<String, f64>,
    #[serde(default)]
    pub target: BTreeMap<String, f64>,
    #[serde(default)]
    pub needs: Vec<NeedConfig>,
    pub produces: Option<ProducesConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedConfig {
    #[serde(default)]
    pub priority: i32,
    pub deadline: Option<f64>,
    pub security: String,
    pub cycle: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducesConfig {
    pub security: String,
    pub cycle: f64,
    pub output: (f64, f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// URL terms joined with `/`; the first must be an http(s) URL.
    pub base: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub trades_csv: Option<String>,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HoloFuelError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HoloFuelError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment's value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HoloFuelError::ConfigError {
            message: format!("environment substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("simulation.name", &self.simulation.name)?;

        let world = &self.world;
        if let Some(duration) = world.duration {
            // Zero runs until interrupted.
            validate_non_negative("world.duration", duration)?;
        }
        if let Some(quanta) = world.quanta {
            validate_positive("world.quanta", quanta)?;
            if world.kind == WorldKind::Realtime {
                return Err(HoloFuelError::InvalidConfigValueError {
                    field: "world.quanta".to_string(),
                    value: quanta.to_string(),
                    reason: "a realtime world's quanta cannot be specified; use scale instead"
                        .to_string(),
                });
            }
        }
        if let Some(scale) = world.scale {
            validate_positive("world.scale", scale)?;
        }

        let venue = &self.venue;
        validate_non_empty_string("venue.name", &venue.name)?;
        if venue.kind != VenueKind::Reserve && (!venue.reserves.is_empty() || venue.issuance.is_some()) {
            return Err(HoloFuelError::ConfigValidationError {
                field: "venue".to_string(),
                message: "reserves and issuance are only meaningful for a reserve".to_string(),
            });
        }
        for tranche in &venue.reserves {
            validate_positive("venue.reserves.price", tranche.price)?;
            validate_positive("venue.reserves.amount", tranche.amount)?;
        }
        if let Some(issuance) = &venue.issuance {
            validate_non_negative("venue.issuance.available", issuance.available)?;
            let optional = [
                ("venue.issuance.period", issuance.period),
                ("venue.issuance.ratio", issuance.ratio),
                ("venue.issuance.factor", issuance.factor),
                ("venue.issuance.premium", issuance.premium),
                ("venue.issuance.book_value", issuance.book_value),
            ];
            for (field, value) in optional {
                if let Some(value) = value {
                    validate_positive(field, value)?;
                }
            }
        }

        let mut identities = HashSet::new();
        for actor in &self.actors {
            validate_non_empty_string("actors.identity", &actor.identity)?;
            if !identities.insert(actor.identity.as_str()) {
                return Err(HoloFuelError::InvalidConfigValueError {
                    field: "actors.identity".to_string(),
                    value: actor.identity.clone(),
                    reason: "identities must be unique".to_string(),
                });
            }
            if let Some(start) = actor.start {
                validate_non_negative("actors.start", start)?;
            }
            if let Some(quanta) = actor.quanta {
                validate_non_negative("actors.quanta", quanta)?;
            }
            for need in &actor.needs {
                validate_non_empty_string("actors.needs.security", &need.security)?;
                validate_positive("actors.needs.cycle", need.cycle)?;
                validate_non_negative("actors.needs.amount", need.amount)?;
            }
            if let Some(produces) = &actor.produces {
                validate_non_empty_string("actors.produces.security", &produces.security)?;
                validate_positive("actors.produces.cycle", produces.cycle)?;
                let (lo, hi) = produces.output;
                validate_non_negative("actors.produces.output", lo)?;
                if !(lo <= hi) {
                    return Err(HoloFuelError::InvalidConfigValueError {
                        field: "actors.produces.output".to_string(),
                        value: format!("[{}, {}]", lo, hi),
                        reason: "the output range must be ascending".to_string(),
                    });
                }
            }
        }

        if let Some(api) = &self.api {
            let first = api.base.first().map(String::as_str).unwrap_or_default();
            validate_url("api.base", first)?;
        }
        if let Some(output) = &self.output {
            validate_path("output.path", &output.path)?;
            if let Some(trades_csv) = &output.trades_csv {
                validate_path("output.trades_csv", trades_csv)?;
            }
        }
        Ok(())
    }

    pub fn build_world(&self) -> Result<Box<dyn World>> {
        let world = &self.world;
        Ok(match world.kind {
            WorldKind::Stepped => Box::new(SteppedWorld::new(
                world.start.unwrap_or(0.0),
                bounded(world.duration, DAY),
                world.quanta.unwrap_or(MINUTE),
            )?),
            WorldKind::Realtime => Box::new(RealtimeWorld::new(world.start, world.duration, world.scale)),
        })
    }

    /// The venue, opened at the world's start.
    pub fn build_venue(&self, now: f64) -> Result<Box<dyn Venue>> {
        let venue = &self.venue;
        let currency = venue.currency.as_deref();
        Ok(match venue.kind {
            VenueKind::Market => Box::new(Market::new(&venue.name, currency)),
            VenueKind::Exchange => Box::new(Exchange::new(&venue.name, currency)),
            VenueKind::Reserve => {
                let reserves = venue.reserves.iter().map(|t| (t.price, t.amount));
                let mut reserve = Reserve::new(&venue.name, venue.identity.as_deref(), reserves, now)?;
                if let Some(config) = &venue.issuance {
                    let defaults = Issuance::new(config.available);
                    reserve = reserve.with_issuance(Issuance {
                        available: config.available,
                        period: config.period.unwrap_or(HOUR),
                        ratio: config.ratio.unwrap_or(defaults.ratio),
                        factor: config.factor.unwrap_or(defaults.factor),
                        premium: config.premium.unwrap_or(defaults.premium),
                        book_value: config.book_value.unwrap_or(defaults.book_value),
                    });
                }
                Box::new(reserve)
            }
        })
    }

    pub fn build_agents(&self, now: f64) -> Result<Vec<Box<dyn Agent>>> {
        let mut agents: Vec<Box<dyn Agent>> = Vec::with_capacity(self.actors.len());
        for config in &self.actors {
            let needs = config
                .needs
                .iter()
                .map(|n| Need::new(n.priority, n.deadline, &n.security, n.cycle, n.amount))
                .collect();
            let mut actor = Actor::new(&config.identity)
                .with_schedule(config.start, config.quanta.unwrap_or(DAY))
                .with_assets(config.assets.clone())
                .with_target(config.target.clone())
                .with_needs(needs)
                .with_minimum(config.minimum.unwrap_or(0.0));
            if let Some(balance) = config.balance {
                let currency = config
                    .currency
                    .clone()
                    .or_else(|| self.venue_currency())
                    .unwrap_or_else(|| "USD".to_string());
                actor = actor.with_balance(currency, balance);
            } else if let Some(currency) = &config.currency {
                actor.account.currency = Some(currency.clone());
            }

            match &config.produces {
                Some(produces) => agents.push(Box::new(Producer::new(
                    actor,
                    &produces.security,
                    produces.cycle,
                    produces.output,
                    now,
                )?)),
                None => agents.push(Box::new(actor)),
            }
        }
        Ok(agents)
    }

    fn venue_currency(&self) -> Option<String> {
        let venue = &self.venue;
        venue.currency.clone().or_else(|| {
            venue
                .name
                .split_once('/')
                .map(|(_, currency)| currency.to_string())
        })
    }

    pub fn build_engine(&self) -> Result<Engine<Box<dyn World>, Box<dyn Venue>>> {
        let world = self.build_world()?;
        let now = world.start();
        let venue = self.build_venue(now)?;
        let agents = self.build_agents(now)?;
        tracing::info!(
            "Configured {:?} venue {} with {} agents",
            self.venue.kind,
            self.venue.name,
            agents.len()
        );
        Ok(Engine::new(world, venue, agents))
    }

    pub fn ledger_client(&self) -> HolofuelClient {
        let base = match &self.api {
            Some(api) => api.base.clone(),
            None => DEFAULT_BASE.iter().map(|s| s.to_string()).collect(),
        };
        HolofuelClient::new(RestClient::new(base))
    }

    pub fn output_path(&self) -> &str {
        self.output.as_ref().map(|o| o.path.as_str()).unwrap_or("./output")
    }

    pub fn trades_csv(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.trades_csv.as_deref())
    }
}

impl Validate for SimulationConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
