//! Startup and dashboard rendering over a real data directory.

mod common;

use std::fs;

use marginflow::app::prepare;
use marginflow::render::DashboardRenderer;
use marginflow::store::SeriesStore;
use marginflow::Error;
use tempfile::TempDir;

use common::{snapshot, test_loop, transport_error, ManualClock, ScriptedFetcher};

#[tokio::test]
async fn prepare_discovers_and_creates_records() {
    let dir = TempDir::new().unwrap();
    let store = SeriesStore::new(dir.path().join("coinsJson"));
    let fetcher = ScriptedFetcher::new(vec![snapshot(1, &[("BTC", 1.0, 1.0), ("ETH", 2.0, 2.0)])]);

    let catalog = prepare(&fetcher, &store).await.unwrap();

    assert_eq!(catalog.assets(), &["BTC".to_string(), "ETH".to_string()]);
    assert!(store.load("BTC").unwrap().is_empty());
    assert!(dir.path().join("coinsJson/ETH.json").exists());
}

#[tokio::test]
async fn prepare_fails_on_transport_error() {
    let dir = TempDir::new().unwrap();
    let store = SeriesStore::new(dir.path());
    let fetcher = ScriptedFetcher::new(vec![transport_error()]);

    let err = prepare(&fetcher, &store).await.unwrap_err();
    assert!(matches!(err, Error::Feed(_)));
}

#[tokio::test]
async fn prepare_fails_on_corrupt_record() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("BTC.json"), b"{").unwrap();
    let store = SeriesStore::new(dir.path());
    let fetcher = ScriptedFetcher::new(vec![snapshot(1, &[("BTC", 1.0, 1.0)])]);

    let err = prepare(&fetcher, &store).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[test]
fn asset_without_observations_renders_empty_chart() {
    let dir = TempDir::new().unwrap();
    let renderer = DashboardRenderer::new(SeriesStore::new(dir.path()));

    let page = renderer.render(&["BTC".to_string()]);

    assert_eq!(page.charts.len(), 1);
    let chart = &page.charts[0];
    assert_eq!(chart.title, "BTC");
    assert!(chart.x_axis.is_empty());
    assert!(chart.borrowed.is_empty());
    assert!(chart.repaid.is_empty());
    assert!(page.to_html().contains("chart-0"));
}

#[test]
fn unreadable_asset_is_left_out() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("BTC.json"), b"garbage").unwrap();
    let renderer = DashboardRenderer::new(SeriesStore::new(dir.path()));

    let page = renderer.render(&["BTC".to_string(), "ETH".to_string()]);

    assert_eq!(page.charts.len(), 1);
    assert_eq!(page.charts[0].title, "ETH");
}

#[tokio::test]
async fn charts_follow_catalog_order_and_stay_aligned() {
    let dir = TempDir::new().unwrap();
    let store = SeriesStore::new(dir.path());
    let clock = ManualClock::at(10);
    let mut lp = test_loop(
        store.clone(),
        clock.clone(),
        vec![
            snapshot(100, &[("BTC", 5.0, 3.0), ("ETH", 1.0, 0.5)]),
            snapshot(150, &[("BTC", 7.0, 4.0)]),
        ],
    );
    clock.set(1_700_000_000);
    lp.poll_once().await;
    clock.set(1_700_000_060);
    lp.poll_once().await;

    let page = DashboardRenderer::new(store).render(&["ETH".to_string(), "BTC".to_string()]);

    let titles: Vec<_> = page.charts.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["ETH", "BTC"]);
    for chart in &page.charts {
        assert_eq!(chart.x_axis.len(), chart.borrowed.len());
        assert_eq!(chart.x_axis.len(), chart.repaid.len());
    }
    assert_eq!(page.charts[1].borrowed, vec![5.0, 7.0]);
    assert_eq!(page.charts[1].repaid, vec![3.0, 4.0]);
}
