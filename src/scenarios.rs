//! The reqres.in contract scenarios.
//!
//! Each scenario is one test: a request step that performs the call and binds
//! the body, followed by a verify step holding the body assertions.

use reqwest::StatusCode;
use serde_json::json;

use crate::asserter::assert_equals;
use crate::asserter::assert_that;
use crate::error::HarnessError;
use crate::models::CreateUserRequest;
use crate::models::CreateUserResponse;
use crate::models::RegistrationFailedResponse;
use crate::models::RegistrationRequest;
use crate::models::RegistrationResponse;
use crate::models::ResourceResponse;
use crate::models::UserResponse;
use crate::models::UsersListResponse;
use crate::step::Report;
use crate::suite::Suite;

pub struct Scenario {
    pub name: &'static str,
    pub title: &'static str,
    run: fn(&Suite, &Report) -> Result<(), HarnessError>,
}

pub struct ScenarioOutcome {
    pub report: Report,
    pub result: Result<(), HarnessError>,
}

const CATALOGUE: &[Scenario] = &[
    Scenario {
        name: "register_defined_user",
        title: "Check defined user was registered",
        run: register_defined_user,
    },
    Scenario {
        name: "register_undefined_user",
        title: "Check non-defined user was registered",
        run: register_undefined_user,
    },
    Scenario {
        name: "single_user_found",
        title: "Check data for found user",
        run: single_user_found,
    },
    Scenario {
        name: "single_user_not_found",
        title: "Check status for non-existing user",
        run: single_user_not_found,
    },
    Scenario {
        name: "single_resource_found",
        title: "Check data and support for found resource",
        run: single_resource_found,
    },
    Scenario {
        name: "create_user",
        title: "Verify data of created user",
        run: create_user,
    },
    Scenario {
        name: "delayed_users_list",
        title: "Check delayed list of users",
        run: delayed_users_list,
    },
];

pub fn catalogue() -> &'static [Scenario] {
    CATALOGUE
}

pub fn find(name: &str) -> Option<&'static Scenario> {
    CATALOGUE.iter().find(|s| s.name == name)
}

impl Scenario {
    pub fn run(&self, suite: &Suite) -> ScenarioOutcome {
        let report = Report::new(self.title);
        let result = (self.run)(suite, &report);

        ScenarioOutcome { report, result }
    }
}

fn register_defined_user(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let body = RegistrationRequest {
        email: "eve.holt@reqres.in".into(),
        password: "pistol".into(),
    };

    let response: RegistrationResponse = report.step("Registration request", || {
        suite
            .given(&suite.registration.request, report)
            .body(&body)
            .post("/register")?
            .then(&suite.registration.response)?
            .extract()
    })?;

    report.step("Verify response", || {
        Ok(assert_equals("token", "QpwL5tke4Pnpja7X4", response.token.as_str())?)
    })
}

fn register_undefined_user(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let body = RegistrationRequest {
        email: "eve.123t@test".into(),
        password: "pistol-non-1".into(),
    };

    let response: RegistrationFailedResponse = report.step("Registration request", || {
        suite
            .given(&suite.generic.request, report)
            .body(&body)
            .post("/register")?
            .then(&suite.generic.response)?
            .status(StatusCode::BAD_REQUEST)?
            .extract()
    })?;

    report.step("Verify response", || {
        Ok(assert_equals(
            "error",
            "Note: Only defined users succeed registration",
            response.error.as_str(),
        )?)
    })
}

fn single_user_found(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let response: UserResponse = report.step("Single user request", || {
        suite
            .given(&suite.generic.request, report)
            .get("/users/2")?
            .then(&suite.generic.response)?
            .status(StatusCode::OK)?
            .extract()
    })?;

    report.step("Verify response", || {
        assert_equals("data.email", "janet.weaver@reqres.in", response.data.email.as_str())?;
        assert_equals("data.first_name", "Janet", response.data.first_name.as_str())?;
        assert_equals("data.last_name", "Weaver", response.data.last_name.as_str())?;
        Ok(())
    })
}

fn single_user_not_found(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    report.step("Single user request", || {
        suite
            .given(&suite.generic.request, report)
            .get("/users/23")?
            .then(&suite.generic.response)?
            .status(StatusCode::NOT_FOUND)?;
        Ok(())
    })
}

fn single_resource_found(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let response: ResourceResponse = report.step("Single resource request", || {
        suite
            .given(&suite.generic.request, report)
            .get("/unknown/2")?
            .then(&suite.generic.response)?
            .status(StatusCode::OK)?
            .expect_json("data.name", json!("fuchsia rose"))?
            .extract()
    })?;

    report.step("Verify response", || {
        assert_equals("data.id", 2, response.data.id)?;
        assert_that("support.url", !response.support.url.is_empty(), "a support url")?;
        assert_that("support.text", !response.support.text.is_empty(), "a support text")?;
        Ok(())
    })
}

fn create_user(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let name = "Adrian Doe Jr";
    let job = "Java developer";
    let body = CreateUserRequest {
        name: name.into(),
        job: job.into(),
    };

    let response: CreateUserResponse = report.step("Create user request", || {
        suite
            .given(&suite.generic.request, report)
            .body(&body)
            .post("/users")?
            .then(&suite.generic.response)?
            .status(StatusCode::CREATED)?
            .extract()
    })?;

    report.step("Verify response", || {
        assert_equals("name", name, response.name.as_str())?;
        assert_equals("job", job, response.job.as_str())?;
        Ok(())
    })
}

fn delayed_users_list(suite: &Suite, report: &Report) -> Result<(), HarnessError> {
    let response: UsersListResponse = report.step("Delayed users request", || {
        suite
            .given(&suite.generic.request, report)
            .query("delay", 3)
            .get("/users")?
            .then(&suite.generic.response)?
            .status(StatusCode::OK)?
            .extract()
    })?;

    report.step("Verify response", || {
        assert_equals("per_page", 6, response.per_page)?;
        assert_equals("total", 12, response.total)?;
        assert_equals("total_pages", 2, response.total_pages)?;

        let second = response.data.get(1);
        assert_that("data[1]", second.is_some(), "at least two users")?;
        if let Some(user) = second {
            assert_equals("data[1].id", 2, user.id)?;
            assert_equals("data[1].email", "janet.weaver@reqres.in", user.email.as_str())?;
        }
        Ok(())
    })
}
