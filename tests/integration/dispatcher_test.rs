// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{dispatcher_with, fast_settings, wait_ended, Collector, MockFetcher, Script};
use fetchrs::{DispatchError, ScraperRequest, ScraperType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_job_gets_exactly_one_result() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    let domains = ["a.com", "b.com", "c.com"];
    let mut expected = HashSet::new();
    for i in 0..30 {
        let url = format!("http://{}/page/{}", domains[i % domains.len()], i);
        expected.insert(url.clone());
        dispatcher.enqueue(collector.request(url)).unwrap();
    }

    wait_ended(&dispatcher).await;

    assert_eq!(collector.arrived(), 30);
    assert_eq!(collector.failed(), 0);
    assert_eq!(collector.dequeued(), 30);

    let delivered: HashSet<String> = collector
        .arrived
        .lock()
        .iter()
        .map(|response| response.url.clone())
        .collect();
    assert_eq!(delivered, expected);

    assert_eq!(dispatcher.current_queue_count(), 0);
    assert_eq!(dispatcher.current_running_size(), 0);
    assert_eq!(fetcher.total_calls(), 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_running_limit_per_domain_is_respected() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed).with_delay(Duration::from_millis(20)));
    let settings = fast_settings();
    let limit = settings.max_running_elements_by_domain;
    let dispatcher = dispatcher_with(fetcher.clone(), settings);
    let collector = Collector::new();

    for i in 0..20 {
        dispatcher
            .enqueue(collector.request(format!("http://slow.com/{}", i)))
            .unwrap();
        dispatcher
            .enqueue(collector.request(format!("http://other.com/{}", i)))
            .unwrap();
    }

    // Sample the registry while work is in flight
    let sampler = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut peak: HashMap<String, usize> = HashMap::new();
            while !dispatcher.is_ended() {
                for (domain, count) in dispatcher.current_running_size_by_domain() {
                    let entry = peak.entry(domain).or_insert(0);
                    *entry = (*entry).max(count);
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            peak
        })
    };

    wait_ended(&dispatcher).await;
    let peak = sampler.await.unwrap();

    assert_eq!(collector.arrived(), 40);
    assert!(fetcher.max_in_flight("slow.com") <= limit);
    assert!(fetcher.max_in_flight("other.com") <= limit);
    assert!(peak.values().all(|count| *count <= limit));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_domains_are_processed_independently() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed).with_delay(Duration::from_millis(30)));
    let settings = fast_settings();
    let dispatcher = dispatcher_with(fetcher.clone(), settings);
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://a.com/1")).unwrap();
    dispatcher.enqueue(collector.request("http://b.com/1")).unwrap();
    dispatcher.enqueue(collector.request("HTTP://B.COM/2")).unwrap();

    assert_eq!(dispatcher.current_queue_count(), 2);

    wait_ended(&dispatcher).await;
    assert_eq!(collector.arrived(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueue_to_new_domain_loses_nothing() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    let mut producers = Vec::new();
    for producer in 0..8 {
        let dispatcher = dispatcher.clone();
        let collector = collector.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..25 {
                dispatcher
                    .enqueue(collector.request(format!("http://fresh.com/{}/{}", producer, i)))
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    assert!(dispatcher.current_queue_count() <= 1);
    assert!(dispatcher.current_consumer_count() <= 1);

    wait_ended(&dispatcher).await;
    assert_eq!(collector.arrived(), 200);
    assert_eq!(fetcher.total_calls(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_requests_are_not_queued() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    for url in ["", "   ", "not a url", "/relative/path"] {
        let result = dispatcher.enqueue(collector.request(url));
        assert!(matches!(result, Err(DispatchError::InvalidRequest(_))), "{}", url);
    }

    let result = dispatcher.enqueue(ScraperRequest::new("http://a.com/"));
    assert!(matches!(result, Err(DispatchError::InvalidRequest(_))));

    assert_eq!(dispatcher.current_queue_count(), 0);
    assert!(dispatcher.is_ended());
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relative_urls_resolve_against_base_url() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let settings = fetchrs::config::settings::DispatcherSettings {
        base_url: Some("http://base.com/root/".to_string()),
        ..fast_settings()
    };
    let dispatcher = dispatcher_with(fetcher.clone(), settings);
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("page")).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(collector.arrived(), 1);
    assert_eq!(fetcher.calls_for("/root/page"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_response_carries_request_fields() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher, fast_settings());

    let arguments = HashMap::from([("job".to_string(), "42".to_string())]);
    let request = ScraperRequest::new("http://a.com/data.bin")
        .with_optional_arguments(arguments.clone())
        .with_scraper_type(ScraperType::Binary);

    let response = dispatcher.fetch(request).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.url, "http://a.com/data.bin");
    assert_eq!(response.optional_arguments, Some(arguments));
    assert_eq!(response.scraper_type, ScraperType::Binary);
    assert_eq!(response.bytes(), Some("/data.bin".as_bytes()));
    assert!(response.text().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dequeue_callback_sees_request_snapshot() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher, fast_settings());
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://a.com/x")).unwrap();
    wait_ended(&dispatcher).await;

    let dequeued = collector.dequeued.lock();
    assert_eq!(dequeued.len(), 1);
    assert_eq!(dequeued[0].url, "http://a.com/x");
    assert!(dequeued[0].payload.is_none());
    assert!(dequeued[0].error.is_none());
}
