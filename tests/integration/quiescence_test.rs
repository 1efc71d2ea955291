// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{dispatcher_with, fast_settings, wait_ended, Collector, MockFetcher, Script};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_subscriber(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_process_fires_once_per_cycle() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed).with_delay(Duration::from_millis(5)));
    let dispatcher = dispatcher_with(fetcher, fast_settings());
    let collector = Collector::new();
    let ended = Arc::new(AtomicUsize::new(0));
    dispatcher
        .subscribe_to_end_process(counting_subscriber(&ended))
        .unwrap();

    for i in 0..10 {
        dispatcher
            .enqueue(collector.request(format!("http://d{}.com/{}", i % 3, i)))
            .unwrap();
    }
    wait_ended(&dispatcher).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert_eq!(collector.arrived(), 10);

    for i in 0..5 {
        dispatcher
            .enqueue(collector.request(format!("http://second.com/{}", i)))
            .unwrap();
    }
    wait_ended(&dispatcher).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(ended.load(Ordering::SeqCst), 2);
    assert_eq!(collector.arrived(), 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_subscriber_is_notified() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher, fast_settings());
    let collector = Collector::new();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    dispatcher
        .subscribe_to_end_process(|| panic!("subscriber failure"))
        .unwrap();
    dispatcher
        .subscribe_to_end_process(counting_subscriber(&first))
        .unwrap();
    dispatcher
        .subscribe_to_end_process(counting_subscriber(&second))
        .unwrap();

    dispatcher.enqueue(collector.request("http://a.com/1")).unwrap();
    wait_ended(&dispatcher).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsubscribed_callback_is_not_invoked() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher, fast_settings());
    let collector = Collector::new();

    let kept = Arc::new(AtomicUsize::new(0));
    let removed = Arc::new(AtomicUsize::new(0));
    dispatcher
        .subscribe_to_end_process(counting_subscriber(&kept))
        .unwrap();
    let key = dispatcher
        .subscribe_to_end_process(counting_subscriber(&removed))
        .unwrap();
    dispatcher.unsubscribe_to_end_process(key).unwrap();

    dispatcher.enqueue(collector.request("http://a.com/1")).unwrap();
    wait_ended(&dispatcher).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(removed.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_notification_without_work() {
    let fetcher = Arc::new(MockFetcher::new(Script::Succeed));
    let dispatcher = dispatcher_with(fetcher, fast_settings());
    let ended = Arc::new(AtomicUsize::new(0));
    dispatcher
        .subscribe_to_end_process(counting_subscriber(&ended))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    dispatcher.wait_until_ended().await;

    assert_eq!(ended.load(Ordering::SeqCst), 0);
}
