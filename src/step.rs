//! Named, nestable report steps.
//!
//! A [`Report`] belongs to one test. [`Report::step`] runs a body exactly once,
//! records it as a node under whichever step is currently open, and hands the
//! body's own result back to the caller untouched.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::asserter::AssertionError;
use crate::error::HarnessError;
use crate::model::ModelBindingError;
use crate::runner::CapturedResponse;
use crate::runner::OutgoingRequest;
use crate::runner::RequestError;
use crate::specification::Filter;
use crate::specification::StatusMismatchError;
use crate::transport::TransportError;

/// Errors a step can record. `kind` names the error in the report.
pub trait StepError: Display {
    fn kind(&self) -> &str;
}

impl StepError for HarnessError {
    fn kind(&self) -> &str {
        HarnessError::kind(self)
    }
}

impl StepError for ModelBindingError {
    fn kind(&self) -> &str {
        "ModelBindingError"
    }
}

impl StepError for StatusMismatchError {
    fn kind(&self) -> &str {
        "StatusMismatchError"
    }
}

impl StepError for TransportError {
    fn kind(&self) -> &str {
        "TransportError"
    }
}

impl StepError for AssertionError {
    fn kind(&self) -> &str {
        "AssertionError"
    }
}

impl StepError for RequestError {
    fn kind(&self) -> &str {
        "RequestError"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub failure: Option<StepFailure>,
    /// Type of the value the body produced, when it passed.
    pub value: Option<String>,
    pub attachments: Vec<Attachment>,
    pub children: Vec<StepRecord>,
}

impl StepRecord {
    fn open(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Passed,
            failure: None,
            value: None,
            attachments: vec![],
            children: vec![],
        }
    }
}

#[derive(Debug, Default)]
struct ReportState {
    name: String,
    steps: Vec<StepRecord>,
    attachments: Vec<Attachment>,
    open: Vec<StepRecord>,
}

impl ReportState {
    fn close(&mut self, record: StepRecord) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(record),
            None => self.steps.push(record),
        }
    }
}

/// The step tree of one test. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct Report {
    state: Arc<Mutex<ReportState>>,
}

/// Closes the step on unwind so a panicking body is still recorded.
struct OpenStep<'a> {
    report: &'a Report,
    done: bool,
}

impl Drop for OpenStep<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        let mut state = self.report.lock();
        if let Some(mut record) = state.open.pop() {
            record.status = StepStatus::Failed;
            record.failure = Some(StepFailure {
                kind: "panic".into(),
                message: "step body panicked".into(),
            });
            state.close(record);
        }
    }
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        let report = Self::default();
        report.lock().name = name.into();
        report
    }

    fn lock(&self) -> MutexGuard<'_, ReportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Runs `body` as a named step.
    ///
    /// The body runs once, synchronously. Its error is recorded and then
    /// returned as is.
    pub fn step<T, E, F>(&self, name: &str, body: F) -> Result<T, E>
    where
        E: StepError,
        F: FnOnce() -> Result<T, E>,
    {
        self.lock().open.push(StepRecord::open(name));
        let mut guard = OpenStep {
            report: self,
            done: false,
        };

        let span = tracing::info_span!("step", name = %name);
        let result = span.in_scope(|| {
            tracing::debug!("step started");
            body()
        });

        let mut state = self.lock();
        guard.done = true;

        if let Some(mut record) = state.open.pop() {
            match &result {
                Ok(_) => {
                    record.status = StepStatus::Passed;
                    let value = std::any::type_name::<T>();
                    if value != "()" {
                        record.value = Some(value.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!(step = %name, kind = e.kind(), error = %e, "step failed");
                    record.status = StepStatus::Failed;
                    record.failure = Some(StepFailure {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
            }
            state.close(record);
        }

        result
    }

    /// Attaches content to the innermost open step, or to the report itself
    /// when no step is open.
    pub fn attach(
        &self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<String>,
    ) {
        let attachment = Attachment {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        };

        let mut state = self.lock();
        match state.open.last_mut() {
            Some(step) => step.attachments.push(attachment),
            None => state.attachments.push(attachment),
        }
    }

    pub fn steps(&self) -> Vec<StepRecord> {
        self.lock().steps.clone()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.lock().attachments.clone()
    }

    pub fn passed(&self) -> bool {
        self.lock()
            .steps
            .iter()
            .all(|step| step.status == StepStatus::Passed)
    }

    /// Names from the first failed top-level step down to the deepest failed
    /// step beneath it.
    pub fn failed_step_path(&self) -> Vec<String> {
        let state = self.lock();
        let mut path = vec![];
        let mut level = &state.steps;

        while let Some(failed) = level.iter().find(|s| s.status == StepStatus::Failed) {
            path.push(failed.name.clone());
            level = &failed.children;
        }

        path
    }

    /// A filter that attaches every request and response to the open step.
    pub fn filter(&self) -> ReportFilter {
        ReportFilter {
            report: self.clone(),
        }
    }
}

pub struct ReportFilter {
    report: Report,
}

fn render_headers(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}\n", k, v.to_str().unwrap_or("<invalid utf8>")))
        .collect()
}

impl Filter for ReportFilter {
    fn name(&self) -> &str {
        "report"
    }

    fn on_request(&self, request: &OutgoingRequest) {
        let mut content = format!("{} {}\n", request.method, request.url);
        content.push_str(&render_headers(&request.headers));
        if let Some(body) = &request.body {
            content.push('\n');
            content.push_str(body);
        }

        self.report.attach("Request", "text/plain", content);
    }

    fn on_response(&self, _request: &OutgoingRequest, response: &CapturedResponse) {
        let mut content = format!("{}\n", response.status);
        content.push_str(&render_headers(&response.headers));
        content.push('\n');
        match &response.body_json {
            Some(json) => {
                content.push_str(&serde_json::to_string_pretty(json).unwrap_or_default())
            }
            None => content.push_str(&response.body_text),
        }

        self.report.attach("Response", "text/plain", content);
    }
}
