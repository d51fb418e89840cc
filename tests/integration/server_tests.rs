//! The HTTP API served over a real socket

use crawl_relay::config::Config;
use crawl_relay::crawler::Coordinator;
use crawl_relay::server::serve;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Picks a port that is free at the time of the call
fn free_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let address = listener.local_addr().expect("Failed to read address");
    drop(listener);
    address.to_string()
}

async fn wait_until_listening(client: &reqwest::Client, base: &str) {
    for _ in 0..100 {
        if client.get(base).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never started", base);
}

#[tokio::test]
async fn test_serve_batch_lifecycle_and_shutdown() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Upstream</h1></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&upstream)
        .await;

    let mut config = Config::default();
    config.server.bind_address = free_address();
    config.retry.min_delay_secs = 0.0;
    config.retry.max_delay_secs = 0.0;

    let coordinator = Coordinator::from_config(&config).expect("Failed to create coordinator");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_config = config.server.clone();
    let server = tokio::spawn(async move {
        serve(&server_config, coordinator, async {
            let _ = stop_rx.await;
        })
        .await
    });

    let base = format!("http://{}", config.server.bind_address);
    let client = reqwest::Client::new();
    wait_until_listening(&client, &base).await;

    let health: Value = client
        .get(&base)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let submitted = client
        .post(format!("{}/api/v1/crawl/batch", base))
        .json(&json!({
            "urls": [format!("{}/a", upstream.uri()), format!("{}/b", upstream.uri())],
            "concurrent_limit": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status().as_u16(), 202);
    let job: Value = submitted.json().await.unwrap();
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..200 {
        status = client
            .get(format!("{}/api/v1/crawl/batch/{}", base, job_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status["status"] == "completed" || status["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["metadata"]["successful_count"], 2);
    let markdown = status["result"]["successful_urls"][0]["markdown"]
        .as_str()
        .unwrap();
    assert!(markdown.contains("Upstream"));

    let missing = client
        .get(format!("{}/api/v1/crawl/batch/{}", base, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    stop_tx.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not shut down")
        .unwrap();
    assert!(stopped.is_ok());
}

#[tokio::test]
async fn test_serve_fails_when_address_in_use() {
    let occupied = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let mut config = Config::default();
    config.server.bind_address = occupied.local_addr().unwrap().to_string();

    let coordinator = Coordinator::from_config(&config).unwrap();
    let result = serve(&config.server, coordinator, async {}).await;

    assert!(result.is_err());
}
