use std::sync::OnceLock;
use std::time::Duration;

use contract_quest::HarnessError;
use contract_quest::Phase;
use contract_quest::Report;
use contract_quest::models::RegistrationFailedResponse;
use contract_quest::models::RegistrationRequest;
use contract_quest::models::RegistrationResponse;
use contract_quest::models::UserResponse;
use contract_quest::models::UsersListResponse;
use contract_quest::scenarios;
use contract_quest::step::StepStatus;
use contract_quest::suite::Suite;
use contract_quest::suite::SuiteConfig;
use contract_quest::transport::TransportErrorKind;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use url::Url;

fn stub_url() -> Url {
    static ADDR: OnceLock<std::net::SocketAddr> = OnceLock::new();
    let addr = ADDR.get_or_init(|| test_app::spawn_background().expect("stub server starts"));
    Url::parse(&format!("http://{addr}")).unwrap()
}

fn suite() -> Suite {
    Suite::new(&SuiteConfig::new(stub_url())).unwrap()
}

#[test]
fn register_defined_user() {
    let suite = suite();
    let report = Report::new("register");

    let response: RegistrationResponse = report
        .step("Registration request", || {
            suite
                .given(&suite.registration.request, &report)
                .body(&RegistrationRequest {
                    email: "eve.holt@reqres.in".into(),
                    password: "pistol".into(),
                })
                .post("/register")?
                .then(&suite.registration.response)?
                .extract()
        })
        .unwrap();

    assert_eq!(response.token, "QpwL5tke4Pnpja7X4");
    assert_eq!(response.id, Some(4));

    let attachments = &report.steps()[0].attachments;
    assert_eq!(attachments.len(), 2);
    assert!(attachments[0].content.contains("\"password\":\"pistol\""));
}

#[test]
fn register_undefined_user() {
    let suite = suite();
    let report = Report::new("register");

    let response: RegistrationFailedResponse = report
        .step("Registration request", || {
            suite
                .given(&suite.generic.request, &report)
                .body(&RegistrationRequest {
                    email: "eve.123t@test".into(),
                    password: "pistol-non-1".into(),
                })
                .post("/register")?
                .then(&suite.generic.response)?
                .status(StatusCode::BAD_REQUEST)?
                .extract()
        })
        .unwrap();

    assert_eq!(
        response.error,
        "Note: Only defined users succeed registration"
    );
}

#[test]
fn undefined_user_against_registration_spec_is_a_status_mismatch() {
    let suite = suite();
    let report = Report::new("register");

    let err = report
        .step("Registration request", || {
            suite
                .given(&suite.registration.request, &report)
                .body(&RegistrationRequest {
                    email: "eve.123t@test".into(),
                    password: "pistol-non-1".into(),
                })
                .post("/register")?
                .then(&suite.registration.response)
        })
        .unwrap_err();

    let HarnessError::StatusMismatch(mismatch) = &err else {
        panic!("expected a status mismatch, got {err:?}");
    };
    assert_eq!(mismatch.expected, StatusCode::OK);
    assert_eq!(mismatch.actual, StatusCode::BAD_REQUEST);

    let step = &report.steps()[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.failure.as_ref().unwrap().message, err.to_string());
}

#[test]
fn single_user_found() {
    let suite = suite();
    let report = Report::new("users");

    let response: UserResponse = report
        .step("Single user request", || {
            suite
                .given(&suite.generic.request, &report)
                .get("/users/2")?
                .then(&suite.generic.response)?
                .status(StatusCode::OK)?
                .extract()
        })
        .unwrap();

    assert_eq!(response.data.email, "janet.weaver@reqres.in");
    assert_eq!(response.data.first_name, "Janet");
    assert_eq!(response.data.last_name, "Weaver");
}

#[test]
fn single_user_not_found() {
    let suite = suite();

    let exchange = suite
        .runner
        .given(&suite.generic.request)
        .get("/users/23")
        .and_then(|e| e.then(&suite.generic.response))
        .unwrap();

    assert_eq!(exchange.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(exchange.response().body_text, "{}");
}

#[test]
fn delayed_users_list() {
    let suite = suite();

    let page: UsersListResponse = suite
        .runner
        .given(&suite.generic.request)
        .get("/users?delay=3")
        .and_then(|e| e.status(StatusCode::OK))
        .and_then(|e| e.extract())
        .unwrap();

    assert_eq!(page.per_page, 6);
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data[1].id, 2);
    assert_eq!(page.data[1].email, "janet.weaver@reqres.in");
}

#[test]
fn timeout_is_a_transport_error() {
    let mut config = SuiteConfig::new(stub_url());
    config.timeout = Duration::from_secs(1);
    let suite = Suite::new(&config).unwrap();

    let err = suite
        .runner
        .given(&suite.generic.request)
        .query("delay", 3)
        .get("/users")
        .unwrap_err();

    let HarnessError::Transport(transport) = &err else {
        panic!("expected a transport error, got {err:?}");
    };
    assert_eq!(transport.kind, TransportErrorKind::Timeout);
    assert_eq!(err.phase(), Phase::Sent);
}

#[test]
fn refused_connection_is_a_transport_error() {
    let suite = Suite::new(&SuiteConfig::new(Url::parse("http://127.0.0.1:9").unwrap())).unwrap();

    let err = suite
        .runner
        .given(&suite.generic.request)
        .get("/users/2")
        .unwrap_err();

    assert_eq!(err.kind(), "TransportError");
}

#[test]
fn every_scenario_passes_against_the_stub() {
    let suite = suite();

    for scenario in scenarios::catalogue() {
        let outcome = scenario.run(&suite);
        assert!(
            outcome.result.is_ok(),
            "{} failed: {:?} at {:?}",
            scenario.name,
            outcome.result,
            outcome.report.failed_step_path()
        );
        assert!(outcome.report.passed());
    }
}

#[test]
fn shared_specifications_across_threads() {
    let suite = suite();
    let names = [
        "register_defined_user",
        "register_undefined_user",
        "single_user_found",
        "single_user_not_found",
        "create_user",
    ];

    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let suite = &suite;
                scope.spawn(move || {
                    let scenario = scenarios::find(name).unwrap();
                    scenario.run(suite).result.is_ok()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|ok| *ok));
    assert_eq!(suite.registration.response.expected_status(), Some(StatusCode::OK));
    assert_eq!(suite.generic.response.expected_status(), None);
}

#[cfg(feature = "live")]
#[test]
fn every_scenario_passes_against_reqres() {
    use reqwest::header::HeaderValue;

    let mut config = SuiteConfig::new(Url::parse("https://reqres.in/api").unwrap());
    config
        .headers
        .insert("x-api-key", HeaderValue::from_static("reqres-free-v1"));
    let suite = Suite::new(&config).unwrap();

    for scenario in scenarios::catalogue() {
        let outcome = scenario.run(&suite);
        assert!(outcome.result.is_ok(), "{}: {:?}", scenario.name, outcome.result);
    }
}
