// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{dispatcher_with, fast_settings, wait_ended, Collector, MockFetcher, Script};
use fetchrs::JobError;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transient_failures_are_retried_until_success() {
    let fetcher = Arc::new(MockFetcher::new(Script::FailTimes(2)));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://flaky.com/item")).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(fetcher.calls_for("/item"), 3);
    assert_eq!(collector.arrived(), 1);
    assert_eq!(collector.failed(), 0);
    // 每次尝试前都会触发出队回调
    assert_eq!(collector.dequeued(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhausted_retries_report_one_exception() {
    let fetcher = Arc::new(MockFetcher::new(Script::AlwaysTransient));
    let settings = fast_settings();
    let max_retries = settings.max_retry_count;
    let dispatcher = dispatcher_with(fetcher.clone(), settings);
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://down.com/item")).unwrap();
    wait_ended(&dispatcher).await;

    let attempts = max_retries as usize + 1;
    assert_eq!(fetcher.calls_for("/item"), attempts);
    assert_eq!(collector.dequeued(), attempts);
    assert_eq!(collector.arrived(), 0);
    assert_eq!(collector.failed(), 1);
    assert_eq!(dispatcher.current_running_size(), 0);

    let failed = collector.failed.lock();
    assert!(failed[0].payload.is_none());
    match failed[0].error.as_ref() {
        Some(JobError::RetriesExhausted { attempts: reported, .. }) => {
            assert_eq!(*reported as usize, attempts)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_permanent_failure_is_not_retried() {
    let fetcher = Arc::new(MockFetcher::new(Script::Permanent));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://gone.com/item")).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(fetcher.calls_for("/item"), 1);
    assert_eq!(collector.failed(), 1);

    let failed = collector.failed.lock();
    assert!(matches!(
        failed[0].error,
        Some(JobError::Fetch { transient: false, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_retries_fails_after_first_attempt() {
    let fetcher = Arc::new(MockFetcher::new(Script::AlwaysTransient));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    dispatcher.set_max_retry_count(0);
    let collector = Collector::new();

    dispatcher.enqueue(collector.request("http://down.com/once")).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(fetcher.calls_for("/once"), 1);
    assert_eq!(collector.failed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_exception_callback_still_releases_job() {
    let fetcher = Arc::new(MockFetcher::new(Script::Permanent));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());

    let request = fetchrs::ScraperRequest::new("http://gone.com/silent").on_data_arrived(|_| {});
    dispatcher.enqueue(request).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(fetcher.calls_for("/silent"), 1);
    assert_eq!(dispatcher.current_running_size(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_callback_does_not_stall_dispatcher() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher.clone(), fast_settings());
    let collector = Collector::new();

    let request = fetchrs::ScraperRequest::new("http://a.com/panics")
        .on_data_arrived(|_| panic!("callback failure"));
    dispatcher.enqueue(request).unwrap();
    dispatcher.enqueue(collector.request("http://a.com/fine")).unwrap();
    wait_ended(&dispatcher).await;

    assert_eq!(collector.arrived(), 1);
    assert_eq!(dispatcher.current_running_size(), 0);
}
