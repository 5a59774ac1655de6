// SPDX-License-Identifier: Apache-2.0 OR MIT
// Integration test: full application boot.
//
// Builds the gateway through `Application::build` (in-memory store, real
// listener on an ephemeral port) and drives one batch through it, the same
// path a production deployment takes apart from config coming from env.

use anyhow::Result;
use integration_tests::{make_token, MockStiVs, OracleBehavior};

#[tokio::test]
async fn built_application_serves_a_batch_on_its_reported_port() -> Result<()> {
    let oracle = MockStiVs::spawn(OracleBehavior::passing()).await;

    let config = shaken_gateway::config::Config {
        bind_host: "127.0.0.1".to_string(),
        // Port 0 asks the OS for an ephemeral port; port() reports the one
        // actually bound.
        port: 0,
        freshness_sec: 60,
        sti_vs_url: oracle.url.clone(),
        sti_vs_timeout_ms: 2000,
        redis_url: None,
    };

    let app = shaken_gateway::startup::Application::build(config).await?;
    let port = app.port();
    assert_ne!(port, 0, "a real port was bound");
    tokio::spawn(app.run());

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let resp = reqwest::Client::new()
        .post(format!(
            "http://127.0.0.1:{port}/ABCD/15551234567/WXYZ/15559876543"
        ))
        .header("content-type", "application/passport")
        .body(make_token("https://cert.example/x", now - 10))
        .send()
        .await?;

    assert_eq!(resp.status(), 201);
    assert_eq!(oracle.calls(), 1);
    Ok(())
}
