use std::fmt::Debug;

use serde_json::Value;
use thiserror::Error;

/// A caller-supplied expectation on a bound model or a raw body did not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("assertion on `{subject}` failed: expected {expected}, got {actual}")]
pub struct AssertionError {
    pub subject: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionError {
    pub fn new(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

pub fn assert_equals<E, A>(subject: &str, expected: E, actual: A) -> Result<(), AssertionError>
where
    E: Debug,
    A: Debug + PartialEq<E>,
{
    if actual != expected {
        return Err(AssertionError::new(
            subject,
            format!("{expected:?}"),
            format!("{actual:?}"),
        ));
    }

    Ok(())
}

pub fn assert_that(subject: &str, holds: bool, expected: &str) -> Result<(), AssertionError> {
    if !holds {
        return Err(AssertionError::new(subject, expected, "false"));
    }

    Ok(())
}

pub fn assert_json(
    path: &str,
    expected: &Value,
    got: Option<&Value>,
) -> Result<(), AssertionError> {
    match got {
        Some(got) if got == expected => Ok(()),
        Some(got) => Err(AssertionError::new(path, expected.to_string(), got.to_string())),
        None => Err(AssertionError::new(path, expected.to_string(), "<missing>")),
    }
}
