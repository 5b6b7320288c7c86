use std::env;

use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = env::var("TEST_APP_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());

    let listener = TcpListener::bind(&addr).await?;
    println!("🚀 reqres stub running at http://{addr}");

    test_app::serve(listener).await
}
