use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::asserter::assert_json;
use crate::error::HarnessError;
use crate::error::Phase;
use crate::model::Model;
use crate::model::ModelBindingError;
use crate::model::bind;
use crate::model::bind_str;
use crate::model::to_wire;
use crate::specification::ContentType;
use crate::specification::Filter;
use crate::specification::RequestSpecification;
use crate::specification::ResponseSpecification;
use crate::specification::check_status;
use crate::transport::HttpTransport;
use crate::transport::Transport;
use crate::transport::TransportError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("`{path}` is relative and no base URI is configured")]
    MissingBaseUri { path: String },

    #[error("`{target}` is not a valid URL: {message}")]
    InvalidUrl { target: String, message: String },

    #[error("invalid content type `{value}`")]
    InvalidContentType { value: String },
}

/// A fully composed request, as handed to the transport and to filters.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body_text: String,
    pub body_json: Option<Value>,
}

impl CapturedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body_text: String) -> Self {
        // Attempt to parse JSON, but don't fail on other bodies
        let body_json = serde_json::from_str::<Value>(&body_text).ok();

        Self {
            status,
            headers,
            body_text,
            body_json,
        }
    }

    /// Looks up a dotted path such as `data.email`, `data.1.id` or
    /// `data[1].id` in the JSON body.
    pub fn json_path(&self, path: &str) -> Option<&Value> {
        let mut current = self.body_json.as_ref()?;

        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (key, indices) = match segment.split_once('[') {
                Some((key, rest)) => (key, Some(rest)),
                None => (segment, None),
            };

            if !key.is_empty() {
                current = match current {
                    Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                    other => other.get(key)?,
                };
            }

            if let Some(indices) = indices {
                for index in indices.split('[') {
                    let index = index.trim_end_matches(']').parse::<usize>().ok()?;
                    current = current.get(index)?;
                }
            }
        }

        Some(current)
    }

    pub fn bind<M: Model>(&self) -> Result<M, ModelBindingError> {
        match &self.body_json {
            Some(json) => bind(json),
            None => bind_str(&self.body_text),
        }
    }
}

/// Issues calls over one transport.
pub struct Runner {
    transport: Arc<dyn Transport>,
}

impl Runner {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn http(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new(timeout)?))
    }

    /// Starts a call that uses `spec` for its defaults.
    pub fn given<'r>(&'r self, spec: &'r RequestSpecification) -> Call<'r> {
        Call {
            transport: self.transport.as_ref(),
            spec,
            base_uri: None,
            content_type: None,
            headers: HeaderMap::new(),
            query: vec![],
            body: None,
            filters: vec![],
        }
    }
}

/// A call in the `Built` state. Call-site values override the specification
/// for this call only.
pub struct Call<'r> {
    transport: &'r dyn Transport,
    spec: &'r RequestSpecification,
    base_uri: Option<Url>,
    content_type: Option<ContentType>,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Result<Value, ModelBindingError>>,
    filters: Vec<Arc<dyn Filter>>,
}

impl<'r> Call<'r> {
    pub fn base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets a model as the payload. Encoding errors surface when the call is
    /// sent.
    pub fn body<M: Model>(mut self, model: &M) -> Self {
        self.body = Some(to_wire(model));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Ok(body));
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn get(self, path: &str) -> Result<Exchange, HarnessError> {
        self.send(Method::GET, path)
    }

    pub fn post(self, path: &str) -> Result<Exchange, HarnessError> {
        self.send(Method::POST, path)
    }

    pub fn put(self, path: &str) -> Result<Exchange, HarnessError> {
        self.send(Method::PUT, path)
    }

    pub fn patch(self, path: &str) -> Result<Exchange, HarnessError> {
        self.send(Method::PATCH, path)
    }

    pub fn delete(self, path: &str) -> Result<Exchange, HarnessError> {
        self.send(Method::DELETE, path)
    }

    /// Resolves the target, dispatches once and waits for the response.
    pub fn send(self, method: Method, path: &str) -> Result<Exchange, HarnessError> {
        let request = self.compose(method, path)?;

        let filters: Vec<&Arc<dyn Filter>> =
            self.spec.filters().iter().chain(self.filters.iter()).collect();

        for filter in &filters {
            filter.on_request(&request);
        }

        let response = self.transport.execute(&request)?;

        for filter in &filters {
            filter.on_response(&request, &response);
        }

        Ok(Exchange { request, response })
    }

    fn compose(&self, method: Method, path: &str) -> Result<OutgoingRequest, HarnessError> {
        let mut url = resolve_url(self.base_uri.as_ref().or(self.spec.base_uri()), path)?;

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut headers = self.spec.headers().clone();
        let content_type = self.content_type.as_ref().or(self.spec.content_type());

        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(content_type.as_str()).map_err(|_| {
                RequestError::InvalidContentType {
                    value: content_type.as_str().to_string(),
                }
            })?;
            headers.insert(CONTENT_TYPE, value);
        }

        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        let body = match &self.body {
            Some(Ok(value)) => Some(
                content_type
                    .unwrap_or(&ContentType::Json)
                    .encode(value),
            ),
            Some(Err(e)) => {
                return Err(HarnessError::ModelBinding {
                    error: e.clone(),
                    phase: Phase::Built,
                });
            }
            None => None,
        };

        Ok(OutgoingRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Picks the single URL a call goes to: an absolute http(s) `target` wins,
/// otherwise it is appended to the path of the base URI. The base keeps its
/// query; a query on `target` is added after it.
pub fn resolve_url(base_uri: Option<&Url>, target: &str) -> Result<Url, RequestError> {
    let invalid = |message: String| RequestError::InvalidUrl {
        target: target.to_string(),
        message,
    };

    match Url::parse(target) {
        Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => return Ok(absolute),
        // `users:batch` parses as an opaque URL with scheme `users`
        Ok(opaque) if opaque.cannot_be_a_base() => {}
        Ok(other) => return Err(invalid(format!("unsupported scheme `{}`", other.scheme()))),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(invalid(e.to_string())),
    }

    let Some(base) = base_uri else {
        return Err(RequestError::MissingBaseUri {
            path: target.to_string(),
        });
    };

    let (rest, fragment) = match target.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (target, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut url = base.clone();
    url.set_path(&format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    ));

    let query = match (base.query(), query) {
        (Some(base_query), Some(query)) => Some(format!("{base_query}&{query}")),
        (base_query, query) => base_query.or(query).map(str::to_string),
    };
    url.set_query(query.as_deref());
    url.set_fragment(fragment);

    Ok(url)
}

/// A call in the `Received` state.
#[derive(Debug, Clone)]
pub struct Exchange {
    request: OutgoingRequest,
    response: CapturedResponse,
}

impl Exchange {
    pub fn request(&self) -> &OutgoingRequest {
        &self.request
    }

    pub fn response(&self) -> &CapturedResponse {
        &self.response
    }

    pub fn status_code(&self) -> StatusCode {
        self.response.status
    }

    /// Applies a response specification: its filters, then its status.
    pub fn then(self, spec: &ResponseSpecification) -> Result<Self, HarnessError> {
        spec.apply(&self.request, &self.response)?;
        Ok(self)
    }

    /// Call-site status expectation, on top of any specification.
    pub fn status(self, expected: StatusCode) -> Result<Self, HarnessError> {
        check_status(expected, self.response.status)?;
        Ok(self)
    }

    pub fn expect_json(self, path: &str, expected: Value) -> Result<Self, HarnessError> {
        assert_json(path, &expected, self.response.json_path(path)).map_err(|error| {
            HarnessError::Assertion {
                error,
                phase: Phase::Received,
            }
        })?;
        Ok(self)
    }

    /// Binds the body to a model (`Bound`).
    pub fn extract<M: Model>(&self) -> Result<M, HarnessError> {
        Ok(self.response.bind()?)
    }
}
