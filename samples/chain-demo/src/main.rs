//! chain-demo - resolve a user's chain under one or every effect family.
//!
//! Usage:
//!   chain-demo --user 1
//!   chain-demo --family deferred --user 5 --miss region --json
//!
//! Environment (also read from `.env`):
//!   RUN_WILD_LOOKUP_TIMEOUT_MS, RUN_WILD_WORKER_THREADS, RUST_LOG

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use run_wild::config::ChainConfig;
use run_wild::control::Program;
use run_wild::domain::{Chain, EntityKind, LookupError, UserId};
use run_wild::registry::{EffectFamily, RunError, Runner};
use run_wild::service::{Behavior, InMemoryDirectory};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chain-demo")]
#[command(about = "Resolve User -> Address -> PostalCode -> Region -> Country")]
struct Cli {
    /// Effect family: immediate, deferred, attempt, or all
    #[arg(long, short = 'f', default_value = "all")]
    family: String,

    /// User identifier to resolve
    #[arg(long, short = 'u', default_value_t = 1)]
    user: u64,

    /// Make every lookup of this kind miss
    #[arg(long, value_enum)]
    miss: Option<Kind>,

    /// Run through the program interpreter or the chain composer
    #[arg(long, value_enum, default_value_t = Via::Program)]
    via: Via,

    /// Print one JSON object per family
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    User,
    Address,
    PostalCode,
    Region,
    Country,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::User => Self::User,
            Kind::Address => Self::Address,
            Kind::PostalCode => Self::PostalCode,
            Kind::Region => Self::Region,
            Kind::Country => Self::Country,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Via {
    Program,
    Composer,
}

#[derive(Serialize)]
struct Report {
    family: EffectFamily,
    user: UserId,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Resolved { chain: Chain },
    Failed { error: LookupError },
    Defect { message: String },
}

impl Outcome {
    fn from_run(result: Result<Result<Chain, LookupError>, RunError>) -> Result<Self> {
        match result {
            Ok(Ok(chain)) => Ok(Self::Resolved { chain }),
            Ok(Err(error)) => Ok(Self::Failed { error }),
            Err(RunError::Defect(defect)) => Ok(Self::Defect {
                message: defect.message().to_string(),
            }),
            Err(error @ RunError::Blocking(_)) => Err(error).context("deferred family could not run"),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Resolved {
                chain: (user, address, postal_code, region, country),
            } => format!(
                "user {} -> address {} -> postal code {} -> region {} -> country {}",
                user.id, address.id, postal_code.id, region.id, country.id
            ),
            Self::Failed { error } => match error {
                LookupError::NotFound(message) => format!("not found: {message}"),
                LookupError::DuplicateFound(message) => format!("ambiguous: {message}"),
                LookupError::Timeout(message) => format!("timed out: {message}"),
                LookupError::HostUnreachable(message) => format!("unreachable: {message}"),
            },
            Self::Defect { message } => format!("defect: {message}"),
        }
    }
}

fn families(choice: &str) -> Result<Vec<EffectFamily>> {
    if choice.trim().eq_ignore_ascii_case("all") {
        return Ok(EffectFamily::ALL.to_vec());
    }
    let family = choice.parse::<EffectFamily>()?;
    Ok(vec![family])
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,run_wild=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let families = families(&cli.family)?;

    let config = match ChainConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::warn!("Failed to load configuration from environment: {error}");
            tracing::info!("Using default configuration");
            ChainConfig::default()
        }
    };
    tracing::info!(?config, "configuration loaded");

    let mut directory = InMemoryDirectory::sample();
    if let Some(kind) = cli.miss {
        directory = directory.with_behavior(kind.into(), Behavior::AlwaysMiss);
    }
    let directory = Arc::new(directory);

    let runner = Runner::new(config).context("failed to build the deferred runtime")?;
    let user = UserId::new(cli.user);

    for family in families {
        let result = match cli.via {
            Via::Program => runner.run_program(family, Arc::clone(&directory), Program::chain(user)),
            Via::Composer => runner.resolve(family, Arc::clone(&directory), user),
        };
        let outcome = Outcome::from_run(result)?;

        if cli.json {
            let report = Report {
                family,
                user,
                outcome,
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{family:>9}: {}", outcome.describe());
        }
    }

    tracing::info!(lookups = directory.call_log().total(), "done");
    Ok(())
}
