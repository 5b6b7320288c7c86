//! Contract testing for HTTP JSON APIs.
//!
//! The harness is three layers:
//!
//! - [`model`]: typed request/response bodies with tolerant binding.
//! - [`specification`]: immutable, reusable request and response defaults.
//! - [`step`]: named, nested report steps wrapping calls and assertions.
//!
//! [`runner`] ties them together into the per-call lifecycle, and
//! [`scenarios`] holds the reqres.in contract checks run by the binary.

pub mod asserter;
pub mod error;
pub mod model;
pub mod models;
pub mod outputter;
pub mod parser;
pub mod runner;
pub mod scenarios;
pub mod specification;
pub mod step;
pub mod suite;
pub mod transport;
pub mod validator;

pub use crate::error::HarnessError;
pub use crate::error::Phase;
pub use crate::runner::Runner;
pub use crate::specification::RequestSpecification;
pub use crate::specification::ResponseSpecification;
pub use crate::specification::build_request_spec;
pub use crate::specification::build_response_spec;
pub use crate::step::Report;
