//! Periodic polling of dependent services
//!
//! Each cycle issues one bounded-timeout GET per configured peer, runs all
//! polls concurrently, and writes the full name→status map in one atomic
//! replace. A check never propagates an error: every failure mode folds
//! into `Unavailable` for that peer alone.

use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use store::{DocumentStore, StoreError};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use types::health::{HealthSnapshot, ServiceStatus};

use crate::config::DependencyConfig;

/// Counters some peers expose on their status endpoint; used to enrich
/// the reported status when present.
#[derive(Debug, Deserialize)]
struct ReportedCounters {
    num_buy_events: Option<u64>,
    num_sell_events: Option<u64>,
}

/// Poll a single peer. Infallible by design: a timeout, connection
/// failure, or non-success status is `Unavailable`, nothing more.
pub async fn check_one(
    client: &reqwest::Client,
    dep: &DependencyConfig,
    timeout: Duration,
) -> ServiceStatus {
    let response = match client.get(&dep.url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(service = %dep.name, error = %err, "service is not available");
            return ServiceStatus::Unavailable;
        }
    };

    if !response.status().is_success() {
        warn!(
            service = %dep.name,
            status = %response.status(),
            "service returned a non-success response"
        );
        return ServiceStatus::Unavailable;
    }

    match response.json::<ReportedCounters>().await {
        Ok(ReportedCounters {
            num_buy_events: Some(buys),
            num_sell_events: Some(sells),
        }) => ServiceStatus::Info(format!(
            "{} has {} Buy Events and {} Sell events",
            display_name(&dep.name),
            buys,
            sells
        )),
        _ => ServiceStatus::Healthy,
    }
}

/// Poll every configured peer concurrently and assemble the snapshot.
pub async fn check_all(
    client: &reqwest::Client,
    dependencies: &[DependencyConfig],
    timeout: Duration,
) -> HealthSnapshot {
    let checks = dependencies
        .iter()
        .map(|dep| async move { (dep.name.clone(), check_one(client, dep, timeout).await) });

    join_all(checks).await.into_iter().collect()
}

/// One full polling cycle: check everything, then replace the snapshot.
pub async fn run_cycle(
    client: &reqwest::Client,
    dependencies: &[DependencyConfig],
    timeout: Duration,
    store: &DocumentStore<HealthSnapshot>,
) -> Result<(), StoreError> {
    info!("starting health check for all services");
    let snapshot = check_all(client, dependencies, timeout).await;

    let reachable = snapshot.values().filter(|s| s.is_reachable()).count();
    store.save(&snapshot)?;
    info!(
        reachable,
        total = snapshot.len(),
        "health check completed"
    );
    Ok(())
}

/// Timer loop for the health job. Awaiting the cycle inside the loop with
/// skipped missed ticks keeps invocations from overlapping themselves.
pub async fn run_scheduler(
    client: reqwest::Client,
    dependencies: Vec<DependencyConfig>,
    timeout: Duration,
    store: DocumentStore<HealthSnapshot>,
    period: Duration,
) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;
        if let Err(err) = run_cycle(&client, &dependencies, timeout, &store).await {
            warn!(error = %err, "could not persist health snapshot, keeping previous one");
        }
    }
}

fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
