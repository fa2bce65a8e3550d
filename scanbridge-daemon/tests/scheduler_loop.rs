use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use scanbridge_core::{ExportStatus, ModificationStamp, Resource, ResourceId, TargetName};
use scanbridge_daemon::{Scheduler, SchedulerConfig, Services};
use scanbridge_scanner::MemoryScanService;
use scanbridge_sink::MemorySink;
use scanbridge_sync::{EngineConfig, Enrichment, FeedSource, KnownExploited, SyncError};

const INTERVAL: Duration = Duration::from_secs(1200);

struct CountingFeed {
    fetches: AtomicUsize,
}

#[async_trait]
impl FeedSource for CountingFeed {
    async fn fetch(&self) -> Result<KnownExploited, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(KnownExploited::from_identifiers(["CVE-2021-44228"]))
    }
}

struct Fixture {
    scanner: Arc<MemoryScanService>,
    sink: Arc<MemorySink>,
    feed: Arc<CountingFeed>,
    services: Services,
}

async fn fixture() -> Fixture {
    let scanner = Arc::new(MemoryScanService::new());
    scanner
        .upsert(
            Resource::new("1", "Weekly Scan"),
            ModificationStamp(10),
            "Plugin ID,CVE\n156032,CVE-2021-44228\n97833,CVE-2017-0144\n",
        )
        .await;
    let sink = Arc::new(MemorySink::new());
    let feed = Arc::new(CountingFeed {
        fetches: AtomicUsize::new(0),
    });
    let enrichment = assert_ok!(Enrichment::load(feed.clone()).await);
    let services = Services::from_parts(scanner.clone(), sink.clone(), enrichment);
    Fixture {
        scanner,
        sink,
        feed,
        services,
    }
}

fn scheduler(services: &Services, cancel: &CancellationToken, refresh: Option<Duration>) -> Scheduler {
    Scheduler::new(
        services.engine(EngineConfig::default(), cancel.clone()),
        SchedulerConfig {
            polling_interval: INTERVAL,
            max_concurrency: 2,
            refresh_interval: refresh,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn runs_a_pass_per_interval_until_cancelled() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    let scheduler = scheduler(&f.services, &cancel, None);

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(60)).await;
    cancel.cancel();
    let passes = handle.await.expect("scheduler task");

    assert_eq!(passes, 3);
    // Only the first pass exported; the others saw an unchanged stamp.
    assert_eq!(f.scanner.export_requests(&ResourceId::from("1")).await, 1);
    assert_eq!(f.sink.count(&TargetName::from("nessus_weekly_scan")).await, 2);
    assert_eq!(f.feed.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_runs_nothing() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let passes = scheduler(&f.services, &cancel, None).run().await;

    assert_eq!(passes, 0);
    assert_eq!(f.scanner.export_requests(&ResourceId::from("1")).await, 0);
}

#[tokio::test(start_paused = true)]
async fn refreshes_enrichment_between_passes_when_due() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    let scheduler = scheduler(&f.services, &cancel, Some(INTERVAL + Duration::from_secs(1)));

    let handle = tokio::spawn(async move { scheduler.run().await });
    // Passes at 0, 1200 and 2400; only the last is past the refresh age.
    tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(60)).await;
    cancel.cancel();
    handle.await.expect("scheduler task");

    assert_eq!(f.feed.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn listing_outage_does_not_stop_the_loop() {
    let f = fixture().await;
    f.scanner.set_listing_unavailable(true).await;
    let cancel = CancellationToken::new();
    let scheduler = scheduler(&f.services, &cancel, None);

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(INTERVAL / 2).await;
    f.scanner.set_listing_unavailable(false).await;
    tokio::time::sleep(INTERVAL).await;
    cancel.cancel();
    let passes = handle.await.expect("scheduler task");

    assert_eq!(passes, 2);
    assert_eq!(f.sink.count(&TargetName::from("nessus_weekly_scan")).await, 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_export_wait_finishes_the_pass_then_stops() {
    let f = fixture().await;
    f.scanner
        .script_statuses(&ResourceId::from("1"), vec![ExportStatus::Processing; 1000])
        .await;
    let cancel = CancellationToken::new();
    let scheduler = scheduler(&f.services, &cancel, None);

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_secs(30)).await;
    cancel.cancel();
    let passes = handle.await.expect("scheduler task");

    assert_eq!(passes, 1);
    assert_eq!(f.sink.count(&TargetName::from("nessus_weekly_scan")).await, 0);
}
