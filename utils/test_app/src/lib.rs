//! A local stand-in for the reqres.in endpoints the contract scenarios use.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::trace::TraceLayer;

pub const TOKEN: &str = "QpwL5tke4Pnpja7X4";
pub const UNDEFINED_USER: &str = "Note: Only defined users succeed registration";

const PER_PAGE: usize = 6;

const USERS: [(&str, &str, &str); 12] = [
    ("george.bluth@reqres.in", "George", "Bluth"),
    ("janet.weaver@reqres.in", "Janet", "Weaver"),
    ("emma.wong@reqres.in", "Emma", "Wong"),
    ("eve.holt@reqres.in", "Eve", "Holt"),
    ("charles.morris@reqres.in", "Charles", "Morris"),
    ("tracey.ramos@reqres.in", "Tracey", "Ramos"),
    ("michael.lawson@reqres.in", "Michael", "Lawson"),
    ("lindsay.ferguson@reqres.in", "Lindsay", "Ferguson"),
    ("tobias.funke@reqres.in", "Tobias", "Funke"),
    ("byron.fields@reqres.in", "Byron", "Fields"),
    ("george.edwards@reqres.in", "George", "Edwards"),
    ("rachel.howell@reqres.in", "Rachel", "Howell"),
];

const RESOURCES: [(&str, i64, &str, &str); 12] = [
    ("cerulean", 2000, "#98B2D1", "15-4020"),
    ("fuchsia rose", 2001, "#C74375", "17-2031"),
    ("true red", 2002, "#BF1932", "19-1664"),
    ("aqua sky", 2003, "#7BC4C4", "14-4811"),
    ("tigerlily", 2004, "#E2583E", "17-1456"),
    ("blue turquoise", 2005, "#53B0AE", "15-5217"),
    ("sand dollar", 2006, "#DECDBE", "13-1106"),
    ("chili pepper", 2007, "#9B1B30", "19-1557"),
    ("blue iris", 2008, "#5A5B9F", "18-3943"),
    ("mimosa", 2009, "#F0C05A", "14-0848"),
    ("turquoise", 2010, "#45B5AA", "15-5519"),
    ("honeysuckle", 2011, "#D94F70", "18-2120"),
];

fn support() -> Value {
    json!({
        "url": "https://reqres.in/#support-heading",
        "text": "To keep ReqRes free, contributions towards server costs are appreciated!"
    })
}

fn user(id: usize) -> Option<Value> {
    let (email, first_name, last_name) = USERS.get(id.checked_sub(1)?)?;

    Some(json!({
        "id": id,
        "email": email,
        "first_name": first_name,
        "last_name": last_name,
        "avatar": format!("https://reqres.in/img/faces/{id}-image.jpg"),
    }))
}

fn resource(id: usize) -> Option<Value> {
    let (name, year, color, pantone_value) = RESOURCES.get(id.checked_sub(1)?)?;

    Some(json!({
        "id": id,
        "name": name,
        "year": year,
        "color": color,
        "pantone_value": pantone_value,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/unknown/{id}", get(get_resource))
        .layer(TraceLayer::new_for_http())
}

/// Serves the stub on `listener` until the process exits.
pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Starts the stub on an ephemeral port in a background thread with its own
/// runtime, and returns the bound address once it accepts connections.
pub fn spawn_background() -> anyhow::Result<SocketAddr> {
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                let _ = tx.send(Err(anyhow::Error::from(e)));
                return;
            }
        };

        runtime.block_on(async move {
            let listener = match TcpListener::bind("127.0.0.1:0").await {
                Ok(listener) => listener,
                Err(e) => {
                    let _ = tx.send(Err(e.into()));
                    return;
                }
            };

            let addr = listener.local_addr().map_err(anyhow::Error::from);
            let _ = tx.send(addr);
            let _ = serve(listener).await;
        });
    });

    rx.recv()?
}

#[derive(Deserialize)]
struct Registration {
    email: Option<String>,
    password: Option<String>,
}

async fn register(Json(payload): Json<Registration>) -> (StatusCode, Json<Value>) {
    let Some(email) = payload.email.filter(|e| !e.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing email or username" })),
        );
    };

    if payload.password.is_none_or(|p| p.is_empty()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing password" })),
        );
    }

    match USERS.iter().position(|(known, _, _)| *known == email) {
        Some(index) => (
            StatusCode::OK,
            Json(json!({ "id": index + 1, "token": TOKEN })),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": UNDEFINED_USER })),
        ),
    }
}

async fn get_user(Path(id): Path<usize>) -> (StatusCode, Json<Value>) {
    match user(id) {
        Some(data) => (
            StatusCode::OK,
            Json(json!({ "data": data, "support": support() })),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn get_resource(Path(id): Path<usize>) -> (StatusCode, Json<Value>) {
    match resource(id) {
        Some(data) => (
            StatusCode::OK,
            Json(json!({ "data": data, "support": support() })),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

#[derive(Deserialize)]
struct ListParams {
    page: Option<usize>,
    delay: Option<u64>,
}

async fn list_users(Query(params): Query<ListParams>) -> Json<Value> {
    if let Some(delay) = params.delay {
        sleep(Duration::from_secs(delay)).await;
    }

    let page = params.page.unwrap_or(1).max(1);
    let total = USERS.len();
    let total_pages = total.div_ceil(PER_PAGE);

    let data = users_page(page);

    Json(json!({
        "page": page,
        "per_page": PER_PAGE,
        "total": total,
        "total_pages": total_pages,
        "data": data,
        "support": support(),
    }))
}

/// Users on a one-based page; pages past the end are empty.
fn users_page(page: usize) -> Vec<Value> {
    let Some(first) = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(PER_PAGE))
        .and_then(|skip| skip.checked_add(1))
    else {
        return vec![];
    };

    (first..first.saturating_add(PER_PAGE))
        .map_while(user)
        .collect()
}

/// Creation time in the shape reqres.in uses, e.g. `2025-01-01T12:00:00.000Z`.
fn created_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Deserialize)]
struct NewUser {
    name: Option<String>,
    job: Option<String>,
}

async fn create_user(Json(payload): Json<NewUser>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "name": payload.name,
            "job": payload.job,
            "id": "512",
            "createdAt": created_at(),
        })),
    )
}
