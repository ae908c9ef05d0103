mod common;

use std::time::Duration;

use common::scenario_orders;
use order_view_engine::models::ViewConfig;
use order_view_engine::{
    derive_order_rows, EngineConfig, ExpansionPhase, ExpansionTracker, ToggleOutcome,
};

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn double_toggle_while_expanding_settles_once() {
    let tracker = ExpansionTracker::from_config(&EngineConfig::default());
    let rows = derive_order_rows(&scenario_orders(), &ViewConfig::default());
    let multi = rows.iter().find(|row| row.is_expandable()).unwrap();

    assert_eq!(
        tracker.toggle(multi.id(), multi.summary.item_count),
        ToggleOutcome::Started(ExpansionPhase::Expanding)
    );
    assert_eq!(
        tracker.toggle(multi.id(), multi.summary.item_count),
        ToggleOutcome::IgnoredInFlight(ExpansionPhase::Expanding)
    );

    let mut observed = vec![tracker.phase(multi.id())];
    for _ in 0..20 {
        advance(50).await;
        let phase = tracker.phase(multi.id());
        if observed.last() != Some(&phase) {
            observed.push(phase);
        }
    }
    assert_eq!(observed, vec![ExpansionPhase::Expanding, ExpansionPhase::Expanded]);
}

#[tokio::test(start_paused = true)]
async fn toggling_during_collapse_does_not_reopen() {
    let tracker = ExpansionTracker::new(Duration::from_millis(300), Duration::from_millis(200));
    let rows = derive_order_rows(&scenario_orders(), &ViewConfig::default());
    let multi = rows.iter().find(|row| row.is_expandable()).unwrap();

    tracker.toggle(multi.id(), 2);
    advance(301).await;
    tracker.toggle(multi.id(), 2);
    assert_eq!(
        tracker.toggle(multi.id(), 2),
        ToggleOutcome::IgnoredInFlight(ExpansionPhase::Collapsing)
    );
    advance(201).await;
    assert_eq!(tracker.phase(multi.id()), ExpansionPhase::Collapsed);
}

#[tokio::test(start_paused = true)]
async fn expand_all_only_touches_multi_item_orders() {
    let tracker = ExpansionTracker::default();
    let rows = derive_order_rows(&scenario_orders(), &ViewConfig::default());

    assert_eq!(tracker.expand_all(&rows), 1);
    advance(301).await;
    let expanded: Vec<_> = rows
        .iter()
        .filter(|row| tracker.phase(row.id()) == ExpansionPhase::Expanded)
        .map(|row| row.order.customer.name.as_str())
        .collect();
    assert_eq!(expanded, vec!["Lucía Romero"]);

    assert_eq!(tracker.expand_all(&rows), 0);
    tracker.collapse_all();
    advance(201).await;
    assert!(tracker.snapshot().is_empty());
}
