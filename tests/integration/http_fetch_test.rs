// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{fast_settings, wait_ended, Collector};
use fetchrs::config::settings::FetcherSettings;
use fetchrs::{Dispatcher, JobError, ReqwestFetcher, ScraperRequest};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_dispatcher() -> Dispatcher {
    let fetcher = ReqwestFetcher::new(FetcherSettings {
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();
    Dispatcher::new(fast_settings(), Arc::new(fetcher)).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetch_text_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
        .mount(&server)
        .await;

    let dispatcher = http_dispatcher();
    let response = dispatcher
        .fetch(ScraperRequest::new(format!("{}/hello", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.text(), Some("hello world"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let dispatcher = http_dispatcher();
    let collector = Collector::new();
    dispatcher
        .enqueue(collector.request(format!("{}/flaky", server.uri())))
        .unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(collector.arrived(), 1);
    assert_eq!(collector.arrived.lock()[0].text(), Some("recovered"));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_not_found_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = http_dispatcher();
    let response = dispatcher
        .fetch(ScraperRequest::new(format!("{}/missing", server.uri())))
        .await
        .unwrap();

    assert!(!response.is_success());
    assert!(matches!(
        response.error,
        Some(JobError::Fetch { transient: false, .. })
    ));
}
