//! Batch crawls against mock HTTP servers

use async_trait::async_trait;
use crawl_relay::config::Config;
use crawl_relay::crawler::{BatchRequest, Coordinator, RetryPolicy};
use crawl_relay::extract::{
    ExtractionError, ExtractionPolicy, ExtractionType, Extractor, LlmConfig, QaPair,
};
use crawl_relay::jobs::JobStatus;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts and no retry delay
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.page_timeout_ms = 500;
    config.retry.max_attempts = 2;
    config.retry.min_delay_secs = 0.0;
    config.retry.max_delay_secs = 0.0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>Test</title></head><body>{}</body></html>",
            body
        ))
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_batch_with_mixed_outcomes() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(
            r#"<h1>Hello</h1><a href="/next">Next</a><img src="/logo.png">"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Retried once, then reported
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    // Exceeds the page timeout on every attempt
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("late").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let config = create_test_config();
    let coordinator = Coordinator::from_config(&config).expect("Failed to create coordinator");

    let request = BatchRequest::new(vec![
        format!("{}/ok", base_url),
        format!("{}/missing", base_url),
        format!("{}/slow", base_url),
        "not a url".to_string(),
    ]);

    let report = coordinator.run_batch(request).await.expect("Batch failed");

    assert_eq!(report.metadata.total_urls, 4);
    assert_eq!(report.metadata.successful_count, 1);
    assert_eq!(report.metadata.failed_count, 3);

    let ok = &report.successful_urls[0];
    assert_eq!(ok.url, format!("{}/ok", base_url));
    assert!(ok.markdown.contains("Hello"));
    assert_eq!(ok.links, vec![format!("{}/next", base_url)]);
    assert_eq!(ok.images, vec![format!("{}/logo.png", base_url)]);
    assert_eq!(ok.metadata.status_code, 200);

    let failure = |suffix: &str| {
        report
            .failed_urls
            .iter()
            .find(|f| f.url.ends_with(suffix))
            .unwrap_or_else(|| panic!("no failure recorded for {}", suffix))
    };

    let missing = failure("/missing");
    assert_eq!(missing.attempt_count, 2);
    assert_eq!(missing.error, "HTTP status 404");

    let slow = failure("/slow");
    assert_eq!(slow.attempt_count, 2);
    assert!(slow.error.contains("timeout"));

    assert_eq!(failure("not a url").attempt_count, 0);
}

#[tokio::test]
async fn test_links_resolve_against_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new/", base_url)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/"))
        .respond_with(html(r#"<a href="child">Child</a>"#))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::from_config(&create_test_config()).unwrap();
    let report = coordinator
        .run_batch(BatchRequest::new(vec![format!("{}/old", base_url)]))
        .await
        .unwrap();

    let result = &report.successful_urls[0];
    assert_eq!(result.url, format!("{}/old", base_url));
    assert_eq!(result.metadata.final_url, format!("{}/new/", base_url));
    assert_eq!(result.links, vec![format!("{}/new/child", base_url)]);
}

#[tokio::test]
async fn test_session_token_sent_as_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(html("members only"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::from_config(&create_test_config()).unwrap();
    let request: BatchRequest = serde_json::from_value(serde_json::json!({
        "urls": [format!("{}/private", mock_server.uri())],
        "session_config": {
            "auth_required": true,
            "credentials": {"token": "secret"},
            "timeout": 2000
        }
    }))
    .unwrap();

    let report = coordinator.run_batch(request).await.unwrap();
    assert_eq!(report.metadata.successful_count, 1);
}

#[tokio::test]
async fn test_submitted_job_reaches_completed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("page"))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::from_config(&create_test_config()).unwrap();
    let mut request = BatchRequest::new(
        (0..6)
            .map(|i| format!("{}/page{}", mock_server.uri(), i))
            .collect(),
    );
    request.concurrent_limit = Some(2);
    request.retry_config = Some(RetryPolicy::no_retry());

    let job = coordinator.submit_batch(request).unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let mut status = coordinator.get_status(job.job_id).unwrap();
    for _ in 0..200 {
        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        status = coordinator.get_status(job.job_id).unwrap();
    }

    assert_eq!(status.status, JobStatus::Completed);
    assert_eq!(status.progress, 1.0);
    let report = status.result.expect("completed job carries a report");
    assert_eq!(report.metadata.successful_count, 6);
}

/// Extractor that answers from the page text without a model
struct KeywordExtractor;

#[async_trait]
impl Extractor for KeywordExtractor {
    async fn summarize(&self, text: &str, _llm: &LlmConfig) -> Result<String, ExtractionError> {
        Ok(text.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
    }

    async fn generate_qa(
        &self,
        _text: &str,
        _llm: &LlmConfig,
    ) -> Result<Vec<QaPair>, ExtractionError> {
        Err(ExtractionError::Failed("not supported".to_string()))
    }

    async fn extract_schema(
        &self,
        _text: &str,
        schema: &Value,
        _llm: &LlmConfig,
    ) -> Result<Value, ExtractionError> {
        Ok(schema.clone())
    }
}

#[tokio::test]
async fn test_batch_extraction_with_custom_extractor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>alpha beta gamma delta</p></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::from_config(&create_test_config())
        .unwrap()
        .with_extractor(Arc::new(KeywordExtractor));

    let mut request = BatchRequest::new(vec![format!("{}/doc", mock_server.uri())]);
    request.extraction_config = Some(ExtractionPolicy {
        extraction_type: ExtractionType::Summary,
        custom_schema: None,
        llm_config: None,
    });

    let report = coordinator.run_batch(request).await.unwrap();
    let result = &report.successful_urls[0];

    assert!(result.extraction_error.is_none());
    let summary = result
        .extracted_content
        .as_ref()
        .and_then(|c| c.summary.clone())
        .unwrap();
    assert_eq!(summary, "alpha beta gamma");
}
