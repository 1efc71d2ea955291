// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use fetchrs::config::settings::Settings;
use fetchrs::infrastructure::metrics::init_metrics;
use fetchrs::utils::telemetry;
use fetchrs::{Dispatcher, ProxyConfig, ReqwestFetcher, ScraperRequest, ScraperType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fetchrs", about = "Fetch URLs concurrently with per-domain limits")]
struct Cli {
    /// URLs to fetch
    #[arg(required = true)]
    urls: Vec<String>,
    /// Fetch raw bytes instead of text
    #[arg(long)]
    binary: bool,
    /// Proxy for every request
    #[arg(long)]
    proxy: Option<String>,
    /// Override the per-domain running limit
    #[arg(long)]
    max_per_domain: Option<usize>,
    /// Gauge report interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    report_interval_ms: u64,
}

/// 主函数
///
/// 加载配置，入队命令行给出的URL，定期打印调度器状态直到全部完成
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.telemetry);
    init_metrics(&settings.metrics)?;
    info!("Starting fetchrs...");

    // 3. Build dispatcher
    let fetcher = Arc::new(ReqwestFetcher::new(settings.fetcher.clone())?);
    let dispatcher = Dispatcher::new(settings.dispatcher.clone(), fetcher)?;
    if let Some(limit) = cli.max_per_domain {
        dispatcher.set_max_running_elements_by_domain(limit);
    }

    let succeeded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let scraper_type = if cli.binary {
        ScraperType::Binary
    } else {
        ScraperType::Text
    };

    dispatcher.subscribe_to_end_process(|| info!("All fetches finished"))?;

    // 4. Enqueue requests
    let mut accepted = 0usize;
    for url in &cli.urls {
        let succeeded = succeeded.clone();
        let failed = failed.clone();
        let mut request = ScraperRequest::new(url.clone())
            .with_scraper_type(scraper_type)
            .on_data_arrived(move |response| {
                succeeded.fetch_add(1, Ordering::SeqCst);
                let size = response.payload.as_ref().map_or(0, |payload| payload.len());
                println!("OK   {} ({} bytes)", response.url, size);
            })
            .on_thrown_exception(move |response| {
                failed.fetch_add(1, Ordering::SeqCst);
                let reason = response
                    .error
                    .as_ref()
                    .map_or_else(|| "unknown error".to_string(), |e| e.to_string());
                println!("FAIL {} ({})", response.url, reason);
            });
        if let Some(proxy) = &cli.proxy {
            request = request.with_proxy(ProxyConfig::new(proxy.clone()));
        }

        match dispatcher.enqueue(request) {
            Ok(()) => accepted += 1,
            Err(e) => warn!("Skipping {}: {}", url, e),
        }
    }
    info!("{} of {} URLs queued", accepted, cli.urls.len());

    // 5. Report until drained
    let report_interval = Duration::from_millis(cli.report_interval_ms.max(1));
    let reporter = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(report_interval);
            loop {
                ticker.tick().await;
                println!(
                    "queues={} queued={} running={} by_domain={:?}",
                    dispatcher.current_queue_count(),
                    dispatcher.current_queue_size(),
                    dispatcher.current_running_size(),
                    dispatcher.current_running_size_by_domain(),
                );
            }
        })
    };

    if accepted > 0 {
        tokio::select! {
            _ = dispatcher.wait_until_ended() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, waiting for running fetches");
                dispatcher.stop().await;
            }
        }
    }
    reporter.abort();

    println!(
        "succeeded={} failed={} pending={}",
        succeeded.load(Ordering::SeqCst),
        failed.load(Ordering::SeqCst),
        dispatcher.current_queue_size(),
    );
    Ok(())
}
