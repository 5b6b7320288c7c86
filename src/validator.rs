use std::time::Duration;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use reqwest::Url;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use thiserror::Error;
use toml::Value;

use crate::parser::ContractQuest;
use crate::scenarios;
use crate::suite::DEFAULT_TIMEOUT;
use crate::suite::SuiteConfig;

// Error messages for parsing URLs
const BASE_URL_ENDS_WITH: &str = "The base URL from setup can't end with a /";
const BASE_URL_NOT_ABSOLUTE: &str = "The base URL must be an absolute http(s) URL";
const BASE_URL_HAS_QUERY: &str = "The base URL can't carry a query or a fragment";

pub struct Validator {
    quest: ContractQuest,
    toml_src: String,
    file_name: String,
}

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid field `{field}`: {message}")]
pub struct ValidationError {
    field: String,
    message: String,
    #[source_code]
    src: Option<NamedSource<String>>,
    #[label("invalid value here")]
    span: Option<SourceSpan>,
}

impl ValidationError {
    pub fn field(&self) -> &str {
        &self.field
    }
}

fn find_span(needle: &str, toml_src: &str) -> Option<SourceSpan> {
    toml_src
        .find(needle)
        .map(|start| SourceSpan::new(start.into(), needle.len()))
}

macro_rules! validation_err {
    ($field:expr, $msg:expr, $self:expr, $snippet:expr) => {
        ValidationError {
            field: $field.to_string(),
            message: $msg.to_string(),
            src: Some(NamedSource::new(
                $self.file_name.clone(),
                $self.toml_src.clone(),
            )),
            span: find_span($snippet, &$self.toml_src),
        }
    };
}

impl Validator {
    pub fn new(quest: &ContractQuest, toml_src: &str, file_name: &str) -> Self {
        Self {
            quest: quest.clone(),
            toml_src: toml_src.into(),
            file_name: file_name.into(),
        }
    }

    pub fn validate(&self) -> Result<SuiteConfig, ValidationError> {
        let base_url = self.validate_base_url(&self.quest.setup.base_url)?;
        let timeout = self.validate_timeout()?;
        let headers = self.validate_headers()?;
        let scenarios = self.validate_scenarios()?;

        Ok(SuiteConfig {
            base_url,
            timeout,
            headers,
            scenarios,
        })
    }

    /// Checks a base URL, either from the file or from a command line
    /// override.
    pub fn validate_base_url(&self, base_url: &str) -> Result<Url, ValidationError> {
        if base_url.ends_with('/') {
            return Err(validation_err!(
                "setup.base_url",
                BASE_URL_ENDS_WITH,
                self,
                base_url
            ));
        }

        let url = Url::parse(base_url)
            .map_err(|e| validation_err!("setup.base_url", e, self, base_url))?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(validation_err!(
                "setup.base_url",
                BASE_URL_NOT_ABSOLUTE,
                self,
                base_url
            ));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(validation_err!(
                "setup.base_url",
                BASE_URL_HAS_QUERY,
                self,
                base_url
            ));
        }

        Ok(url)
    }

    fn validate_timeout(&self) -> Result<Duration, ValidationError> {
        match self.quest.setup.timeout_secs {
            None => Ok(DEFAULT_TIMEOUT),
            Some(0) => Err(validation_err!(
                "setup.timeout_secs",
                "The timeout must be at least one second",
                self,
                "timeout_secs"
            )),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    fn validate_headers(&self) -> Result<HeaderMap, ValidationError> {
        let Some(value) = self.quest.global.as_ref().and_then(|g| g.headers.as_ref()) else {
            return Ok(HeaderMap::new());
        };

        let map = value.as_table().ok_or_else(|| {
            validation_err!(
                "global.headers",
                format!("Expected a table for headers, got {value:?}"),
                self,
                "headers"
            )
        })?;

        let mut header_map = HeaderMap::new();
        for (k, v) in map {
            self.parse_single_header(&mut header_map, k, v)?;
        }

        Ok(header_map)
    }

    fn parse_single_header(
        &self,
        header_map: &mut HeaderMap,
        key: &str,
        value: &Value,
    ) -> Result<(), ValidationError> {
        let v_str = value.as_str().ok_or_else(|| {
            validation_err!(
                key,
                format!("Header value must be a string, got {value:?}"),
                self,
                key
            )
        })?;

        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            validation_err!(key, format!("Invalid header name `{key}`: {e}"), self, key)
        })?;

        let h_value = HeaderValue::from_str(v_str).map_err(|e| {
            validation_err!(
                key,
                format!("Invalid header value for `{key}`: {e}"),
                self,
                v_str
            )
        })?;

        header_map.insert(name, h_value);
        Ok(())
    }

    fn validate_scenarios(&self) -> Result<Vec<String>, ValidationError> {
        let Some(selected) = self.quest.run.as_ref().and_then(|r| r.scenarios.as_ref()) else {
            return Ok(vec![]);
        };

        for name in selected {
            if scenarios::find(name).is_none() {
                return Err(validation_err!(
                    "run.scenarios",
                    format!("Unknown scenario `{name}`"),
                    self,
                    name
                ));
            }
        }

        Ok(selected.clone())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::parser::ContractQuest;
    use crate::validator::Validator;

    fn validate(src: &str) -> Result<crate::suite::SuiteConfig, crate::validator::ValidationError> {
        let quest: ContractQuest = toml::from_str(src).unwrap();
        Validator::new(&quest, src, "contract_quest.toml").validate()
    }

    #[test]
    fn valid_file() {
        let config = validate(
            r#"
            [setup]
            base_url = "https://reqres.in/api"
            timeout_secs = 3

            [global]
            headers = { x-api-key = "reqres-free-v1" }

            [run]
            scenarios = ["register_defined_user", "delayed_users_list"]
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_str(), "https://reqres.in/api");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.headers.get("x-api-key").unwrap(), "reqres-free-v1");
        assert_eq!(config.scenarios.len(), 2);
    }

    #[test]
    fn trailing_slash_is_rejected() {
        let err = validate(
            r#"
            [setup]
            base_url = "https://reqres.in/api/"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "setup.base_url");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = validate(
            r#"
            [setup]
            base_url = "mailto:someone@reqres.in"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "setup.base_url");
    }

    #[test]
    fn base_url_with_query_is_rejected() {
        for base_url in ["https://reqres.in/api?key=1", "https://reqres.in/api#users"] {
            let src = format!("[setup]\nbase_url = \"{base_url}\"\n");
            let err = validate(&src).unwrap_err();
            assert_eq!(err.field(), "setup.base_url");
            assert!(err.to_string().contains("query or a fragment"));
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = validate(
            r#"
            [setup]
            base_url = "https://reqres.in/api"
            timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "setup.timeout_secs");
    }

    #[test]
    fn header_values_must_be_strings() {
        let err = validate(
            r#"
            [setup]
            base_url = "https://reqres.in/api"

            [global]
            headers = { x-retries = 3 }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "x-retries");
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let err = validate(
            r#"
            [setup]
            base_url = "https://reqres.in/api"

            [run]
            scenarios = ["does_not_exist"]
            "#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "run.scenarios");
    }
}
