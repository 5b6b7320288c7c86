//! Reusable request and response specifications.
//!
//! A specification is built once, never changes afterwards, and can be shared
//! by any number of calls. Deriving a variant (`with_filter`, `with_header`,
//! `expect_status`) returns a new value and leaves the original untouched.

use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::runner::CapturedResponse;
use crate::runner::OutgoingRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Custom(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain",
            ContentType::Custom(mime) => mime,
        }
    }

    /// Encodes a payload for the wire. JSON is always compact JSON text; other
    /// types send strings verbatim and anything else as JSON text.
    pub fn encode(&self, body: &Value) -> String {
        match (self, body) {
            (ContentType::Json, _) => body.to_string(),
            (_, Value::String(s)) => s.clone(),
            (_, other) => other.to_string(),
        }
    }
}

/// What a [`LogFilter`] writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogDetail {
    Uri,
    Method,
    Headers,
    Body,
    Status,
}

/// Observes requests and responses passing through a specification.
///
/// Filters only get shared references: they can log or report, they cannot
/// change what is sent or what was received.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    fn on_request(&self, _request: &OutgoingRequest) {}

    fn on_response(&self, _request: &OutgoingRequest, _response: &CapturedResponse) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Request,
    Response,
}

#[derive(Debug, Clone)]
pub struct LogFilter {
    side: Side,
    details: Vec<LogDetail>,
}

impl LogFilter {
    pub fn request(details: &[LogDetail]) -> Self {
        Self {
            side: Side::Request,
            details: details.to_vec(),
        }
    }

    pub fn response(details: &[LogDetail]) -> Self {
        Self {
            side: Side::Response,
            details: details.to_vec(),
        }
    }

    pub fn details(&self) -> &[LogDetail] {
        &self.details
    }
}

fn headers_line(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.to_str().unwrap_or("<invalid utf8>")))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Filter for LogFilter {
    fn name(&self) -> &str {
        match self.side {
            Side::Request => "log-request",
            Side::Response => "log-response",
        }
    }

    fn on_request(&self, request: &OutgoingRequest) {
        if self.side != Side::Request {
            return;
        }

        for detail in &self.details {
            match detail {
                LogDetail::Uri => tracing::info!(uri = %request.url, "request uri"),
                LogDetail::Method => tracing::info!(method = %request.method, "request method"),
                LogDetail::Headers => {
                    tracing::info!(headers = %headers_line(&request.headers), "request headers")
                }
                LogDetail::Body => match &request.body {
                    Some(body) => tracing::info!(body = %body, "request body"),
                    None => tracing::info!("request body: <none>"),
                },
                LogDetail::Status => {}
            }
        }
    }

    fn on_response(&self, _request: &OutgoingRequest, response: &CapturedResponse) {
        if self.side != Side::Response {
            return;
        }

        for detail in &self.details {
            match detail {
                LogDetail::Status => tracing::info!(status = %response.status, "response status"),
                LogDetail::Headers => {
                    tracing::info!(headers = %headers_line(&response.headers), "response headers")
                }
                LogDetail::Body => tracing::info!(body = %response.body_text, "response body"),
                LogDetail::Uri | LogDetail::Method => {}
            }
        }
    }
}

fn filter_names(filters: &[Arc<dyn Filter>]) -> Vec<&str> {
    filters.iter().map(|f| f.name()).collect()
}

#[derive(Clone, Default)]
pub struct RequestSpecification {
    base_uri: Option<Url>,
    content_type: Option<ContentType>,
    headers: HeaderMap,
    filters: Vec<Arc<dyn Filter>>,
}

impl fmt::Debug for RequestSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpecification")
            .field("base_uri", &self.base_uri.as_ref().map(Url::as_str))
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("filters", &filter_names(&self.filters))
            .finish()
    }
}

impl RequestSpecification {
    pub fn builder() -> RequestSpecBuilder {
        RequestSpecBuilder::default()
    }

    pub fn base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn with_filter(&self, filter: impl Filter + 'static) -> Self {
        let mut derived = self.clone();
        derived.filters.push(Arc::new(filter));
        derived
    }

    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut derived = self.clone();
        derived.headers.insert(name, value);
        derived
    }
}

#[derive(Default)]
pub struct RequestSpecBuilder {
    spec: RequestSpecification,
    log: Vec<LogDetail>,
}

impl RequestSpecBuilder {
    pub fn base_uri(mut self, base_uri: Url) -> Self {
        self.spec.base_uri = Some(base_uri);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.spec.content_type = Some(content_type);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.spec.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.spec.headers.extend(headers);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.spec.filters.push(Arc::new(filter));
        self
    }

    pub fn log(mut self, detail: LogDetail) -> Self {
        if !self.log.contains(&detail) {
            self.log.push(detail);
        }
        self
    }

    pub fn build(mut self) -> RequestSpecification {
        if !self.log.is_empty() {
            self.spec
                .filters
                .push(Arc::new(LogFilter::request(&self.log)));
        }
        self.spec
    }
}

pub fn build_request_spec(
    base_uri: Option<Url>,
    content_type: ContentType,
    filters: Vec<Arc<dyn Filter>>,
) -> RequestSpecification {
    RequestSpecification {
        base_uri,
        content_type: Some(content_type),
        headers: HeaderMap::new(),
        filters,
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected status {expected}, got {actual}")]
pub struct StatusMismatchError {
    pub expected: StatusCode,
    pub actual: StatusCode,
}

/// Checks a received status against an expected one.
pub fn check_status(expected: StatusCode, actual: StatusCode) -> Result<(), StatusMismatchError> {
    if expected != actual {
        return Err(StatusMismatchError { expected, actual });
    }

    Ok(())
}

#[derive(Clone, Default)]
pub struct ResponseSpecification {
    expected_status: Option<StatusCode>,
    filters: Vec<Arc<dyn Filter>>,
}

impl fmt::Debug for ResponseSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSpecification")
            .field("expected_status", &self.expected_status)
            .field("filters", &filter_names(&self.filters))
            .finish()
    }
}

impl ResponseSpecification {
    pub fn builder() -> ResponseSpecBuilder {
        ResponseSpecBuilder::default()
    }

    pub fn expected_status(&self) -> Option<StatusCode> {
        self.expected_status
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn expect_status(&self, status: StatusCode) -> Self {
        let mut derived = self.clone();
        derived.expected_status = Some(status);
        derived
    }

    pub fn with_filter(&self, filter: impl Filter + 'static) -> Self {
        let mut derived = self.clone();
        derived.filters.push(Arc::new(filter));
        derived
    }

    /// Runs the filters, then the status expectation if one was declared.
    pub fn apply(
        &self,
        request: &OutgoingRequest,
        response: &CapturedResponse,
    ) -> Result<(), StatusMismatchError> {
        for filter in &self.filters {
            filter.on_response(request, response);
        }

        match self.expected_status {
            Some(expected) => check_status(expected, response.status),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct ResponseSpecBuilder {
    spec: ResponseSpecification,
    log: Vec<LogDetail>,
}

impl ResponseSpecBuilder {
    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.spec.expected_status = Some(status);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.spec.filters.push(Arc::new(filter));
        self
    }

    pub fn log(mut self, detail: LogDetail) -> Self {
        if !self.log.contains(&detail) {
            self.log.push(detail);
        }
        self
    }

    pub fn build(mut self) -> ResponseSpecification {
        if !self.log.is_empty() {
            self.spec
                .filters
                .push(Arc::new(LogFilter::response(&self.log)));
        }
        self.spec
    }
}

pub fn build_response_spec(
    expected_status: Option<StatusCode>,
    filters: Vec<Arc<dyn Filter>>,
) -> ResponseSpecification {
    ResponseSpecification {
        expected_status,
        filters,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::Mutex;

    use reqwest::Method;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use url::Url;

    use crate::runner::CapturedResponse;
    use crate::runner::OutgoingRequest;
    use crate::specification::ContentType;
    use crate::specification::Filter;
    use crate::specification::LogDetail;
    use crate::specification::RequestSpecification;
    use crate::specification::ResponseSpecification;
    use crate::specification::StatusMismatchError;
    use crate::specification::build_request_spec;
    use crate::specification::build_response_spec;

    #[derive(Default)]
    struct Seen(Mutex<Vec<u16>>);

    impl Filter for Arc<Seen> {
        fn name(&self) -> &str {
            "seen"
        }

        fn on_response(&self, _request: &OutgoingRequest, response: &CapturedResponse) {
            self.0.lock().unwrap().push(response.status.as_u16());
        }
    }

    fn exchange(status: StatusCode) -> (OutgoingRequest, CapturedResponse) {
        let request = OutgoingRequest {
            method: Method::GET,
            url: Url::parse("http://localhost/users/2").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };
        let response = CapturedResponse::new(status, HeaderMap::new(), "{}".into());
        (request, response)
    }

    #[test]
    fn builders_do_no_io_and_keep_order() {
        let spec = RequestSpecification::builder()
            .base_uri(Url::parse("https://reqres.in/api").unwrap())
            .content_type(ContentType::Json)
            .log(LogDetail::Uri)
            .log(LogDetail::Method)
            .log(LogDetail::Uri)
            .build();

        assert_eq!(spec.base_uri().unwrap().as_str(), "https://reqres.in/api");
        assert_eq!(spec.content_type(), Some(&ContentType::Json));
        assert_eq!(spec.filters().len(), 1);
        assert_eq!(spec.filters()[0].name(), "log-request");
    }

    #[test]
    fn deriving_never_mutates_the_original() {
        let base = build_request_spec(None, ContentType::Json, vec![]);
        let keyed = base.with_header(
            "x-api-key".parse().unwrap(),
            HeaderValue::from_static("reqres-free-v1"),
        );

        assert!(base.headers().is_empty());
        assert_eq!(keyed.headers().len(), 1);

        let plain = build_response_spec(None, vec![]);
        let strict = plain.expect_status(StatusCode::OK);
        assert_eq!(plain.expected_status(), None);
        assert_eq!(strict.expected_status(), Some(StatusCode::OK));
    }

    #[test]
    fn status_mismatch_carries_both_values() {
        let spec = ResponseSpecification::builder()
            .expect_status(StatusCode::OK)
            .log(LogDetail::Status)
            .log(LogDetail::Body)
            .build();

        let (request, response) = exchange(StatusCode::BAD_REQUEST);
        assert_eq!(
            spec.apply(&request, &response),
            Err(StatusMismatchError {
                expected: StatusCode::OK,
                actual: StatusCode::BAD_REQUEST,
            })
        );

        let (request, response) = exchange(StatusCode::OK);
        assert_eq!(spec.apply(&request, &response), Ok(()));
    }

    #[test]
    fn filters_run_even_without_expected_status() {
        let seen = Arc::new(Seen::default());
        let spec = build_response_spec(None, vec![]).with_filter(seen.clone());

        for status in [StatusCode::OK, StatusCode::NOT_FOUND] {
            let (request, response) = exchange(status);
            spec.apply(&request, &response).unwrap();
        }

        assert_eq!(*seen.0.lock().unwrap(), vec![200, 404]);
    }

    #[test]
    fn content_type_encoding() {
        assert_eq!(ContentType::Json.encode(&json!("a")), "\"a\"");
        assert_eq!(ContentType::Text.encode(&json!("a")), "a");
        assert_eq!(
            ContentType::Custom("application/x-ndjson".into()).encode(&json!({"k": 1})),
            "{\"k\":1}"
        );
    }
}
