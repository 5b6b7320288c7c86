#![allow(clippy::result_large_err)]

use std::io::ErrorKind;

use clap::Parser;
use contract_quest::outputter::OutPutter;
use contract_quest::parser::ContractQuest;
use contract_quest::parser::Setup;
use contract_quest::scenarios;
use contract_quest::scenarios::Scenario;
use contract_quest::suite::Suite;
use contract_quest::suite::SuiteConfig;
use contract_quest::transport::TransportError;
use contract_quest::validator::ValidationError;
use contract_quest::validator::Validator;
use miette::Diagnostic;
use miette::Result;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Cli;

mod cli;

#[derive(Error, Debug, Diagnostic)]
pub enum ContractQuestError {
    #[error("Failed to read toml file")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse toml file")]
    TomlParsing(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ValidationError(#[from] ValidationError),

    #[error("Failed to build the HTTP client: {0}")]
    ClientError(#[from] TransportError),

    #[error("Unknown scenario `{0}`")]
    #[diagnostic(help("run with --list to see the available scenarios"))]
    UnknownScenario(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },
}

/// Reads and validates the suite file, then applies command line overrides.
///
/// A missing file is fine when `--base-url` is given: every other setting has
/// a default.
fn load_config(cli: &Cli) -> Result<SuiteConfig, ContractQuestError> {
    let (quest, contents) = match std::fs::read_to_string(&cli.path) {
        Ok(contents) => (toml::from_str::<ContractQuest>(&contents)?, contents),
        Err(e) if e.kind() == ErrorKind::NotFound && cli.base_url.is_some() => {
            let quest = ContractQuest {
                setup: Setup {
                    base_url: cli.base_url.clone().unwrap_or_default(),
                    timeout_secs: None,
                },
                global: None,
                run: None,
            };
            (quest, String::new())
        }
        Err(e) => return Err(ContractQuestError::FileError(e)),
    };

    let validator = Validator::new(&quest, &contents, &cli.path);
    let mut config = validator.validate()?;

    if let Some(base_url) = &cli.base_url {
        config.base_url = validator.validate_base_url(base_url)?;
    }

    if !cli.scenarios.is_empty() {
        config.scenarios = cli.scenarios.clone();
    }

    Ok(config)
}

fn select(config: &SuiteConfig) -> Result<Vec<&'static Scenario>, ContractQuestError> {
    if config.scenarios.is_empty() {
        return Ok(scenarios::catalogue().iter().collect());
    }

    config
        .scenarios
        .iter()
        .map(|name| {
            scenarios::find(name).ok_or_else(|| ContractQuestError::UnknownScenario(name.clone()))
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("contract_quest=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.list {
        for scenario in scenarios::catalogue() {
            println!("{:<26} {}", scenario.name, scenario.title);
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let selected = select(&config)?;

    tracing::info!(
        base_url = %config.base_url,
        scenarios = selected.len(),
        "starting contract run"
    );

    let suite = Suite::new(&config).map_err(ContractQuestError::ClientError)?;

    // Scenarios run one after another; each gets its own report
    let outcomes: Vec<_> = selected.iter().map(|s| s.run(&suite)).collect();
    let reports: Vec<_> = outcomes.iter().map(|o| o.report.clone()).collect();

    OutPutter::start(&reports, &cli.path);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        return Err(ContractQuestError::ScenariosFailed {
            failed,
            total: outcomes.len(),
        }
        .into());
    }

    Ok(())
}
