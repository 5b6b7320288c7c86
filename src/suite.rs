//! Suite-scoped configuration and the specification pairs built from it.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use url::Url;

use crate::runner::Call;
use crate::runner::Runner;
use crate::specification::ContentType;
use crate::specification::LogDetail;
use crate::specification::RequestSpecification;
use crate::specification::ResponseSpecification;
use crate::step::Report;
use crate::transport::TransportError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub headers: HeaderMap,
    /// Scenario names to run; empty means all of them.
    pub scenarios: Vec<String>,
}

impl SuiteConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            scenarios: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecPair {
    pub request: RequestSpecification,
    pub response: ResponseSpecification,
}

/// Everything a scenario needs, built once per run and shared read-only.
pub struct Suite {
    pub runner: Runner,
    pub generic: SpecPair,
    pub registration: SpecPair,
}

fn request_spec(config: &SuiteConfig) -> RequestSpecification {
    RequestSpecification::builder()
        .base_uri(config.base_url.clone())
        .content_type(ContentType::Json)
        .headers(config.headers.clone())
        .log(LogDetail::Uri)
        .log(LogDetail::Method)
        .log(LogDetail::Body)
        .build()
}

impl Suite {
    pub fn new(config: &SuiteConfig) -> Result<Self, TransportError> {
        Ok(Self::with_runner(config, Runner::http(config.timeout)?))
    }

    pub fn with_runner(config: &SuiteConfig, runner: Runner) -> Self {
        let generic = SpecPair {
            request: request_spec(config),
            response: ResponseSpecification::builder()
                .log(LogDetail::Status)
                .log(LogDetail::Body)
                .build(),
        };

        let registration = SpecPair {
            request: request_spec(config),
            response: ResponseSpecification::builder()
                .log(LogDetail::Status)
                .log(LogDetail::Body)
                .expect_status(StatusCode::OK)
                .build(),
        };

        Self {
            runner,
            generic,
            registration,
        }
    }

    /// Starts a call whose request and response are attached to `report`.
    pub fn given<'s>(&'s self, spec: &'s RequestSpecification, report: &Report) -> Call<'s> {
        self.runner.given(spec).filter(report.filter())
    }
}
