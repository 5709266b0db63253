mod common;

use common::{five_second_config, scheduler_with, Scripted};
use display_scheduler::{ContentUnit, TickOutcome};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn unit(mode: &str, provider: &str) -> ContentUnit {
    ContentUnit::new(mode, provider)
}

#[test]
fn long_cycle_is_capped_by_provider_cap() {
    // cycle 42s, provider cap 30s, base 10s
    let ticker = Scripted::new("ticker", &["ticker"])
        .duration(10.0)
        .dynamic(Some(30.0), Some(42.0));
    let (mut scheduler, clock) = scheduler_with(vec![ticker], five_second_config());

    assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("ticker", "ticker")));
    assert_eq!(clock.elapsed(), Duration::from_secs(30));
}

#[test]
fn global_cap_bounds_open_ended_cycles() {
    let ticker = Scripted::new("ticker", &["ticker"]).dynamic(None, None);
    let config = five_second_config().dynamic_duration_cap(20.0);
    let (mut scheduler, clock) = scheduler_with(vec![ticker], config);

    scheduler.tick();
    assert_eq!(clock.elapsed(), Duration::from_secs(20));
}

#[test]
fn completed_cycle_exits_after_minimum_plus_grace() {
    let ticker = Scripted::new("ticker", &["ticker"])
        .duration(10.0)
        .dynamic(Some(30.0), Some(42.0));
    let cycle_done = ticker.cycle_flag();
    let (scheduler, clock) = scheduler_with(vec![ticker], five_second_config());
    let trigger = clock.clone();
    let mut scheduler = scheduler.with_background(move || {
        if trigger.elapsed() >= Duration::from_secs(4) {
            cycle_done.store(true, Ordering::Relaxed);
        }
    });

    assert_eq!(
        scheduler.tick(),
        TickOutcome::CycleComplete(unit("ticker", "ticker"))
    );
    // 10s minimum + 0.5s grace, observed on the next 1s tick
    assert_eq!(clock.elapsed(), Duration::from_secs(11));
}

#[test]
fn static_unit_ignores_cycle_completion() {
    let board = Scripted::new("board", &["board"]);
    board.cycle_flag().store(true, Ordering::Relaxed);
    let (mut scheduler, clock) = scheduler_with(vec![board], five_second_config());

    assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("board", "board")));
    assert_eq!(clock.elapsed(), Duration::from_secs(5));
}

#[test]
fn cycle_state_resets_only_when_dynamic_unit_changes() {
    let ticker = Scripted::new("ticker", &["ticker"]).dynamic(Some(30.0), Some(12.0));
    let resets = ticker.resets();
    let (mut scheduler, _) = scheduler_with(vec![ticker], five_second_config());

    scheduler.tick();
    scheduler.tick();
    assert_eq!(resets.load(Ordering::Relaxed), 1);
}

#[test]
fn static_unit_in_between_forgets_last_dynamic_unit() {
    let ticker = Scripted::new("ticker", &["ticker"]).dynamic(Some(30.0), Some(12.0));
    let resets = ticker.resets();
    let (mut scheduler, _) = scheduler_with(
        vec![ticker, Scripted::new("clock", &["clock"])],
        five_second_config(),
    );

    for _ in 0..3 {
        scheduler.tick();
    }
    assert_eq!(resets.load(Ordering::Relaxed), 2);
}

#[test]
fn cycle_query_error_runs_to_target_duration() {
    let ticker = Scripted::new("ticker", &["ticker"])
        .duration(10.0)
        .dynamic(Some(30.0), Some(42.0))
        .cycle_error();
    ticker.cycle_flag().store(true, Ordering::Relaxed);
    let (mut scheduler, clock) = scheduler_with(vec![ticker], five_second_config());

    assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("ticker", "ticker")));
    assert_eq!(clock.elapsed(), Duration::from_secs(30));
}

#[test]
fn huge_provider_duration_is_clamped() {
    let board = Scripted::new("board", &["board"]).duration(1e30);
    let (mut scheduler, clock) = scheduler_with(vec![board], five_second_config());

    let stats = scheduler.run_for(Duration::from_secs(10));
    assert_eq!(stats.activations, 1);
    assert_eq!(stats.rotation_advances, 0);
    assert_eq!(clock.elapsed(), Duration::from_secs(10));
}

#[test]
fn huge_global_cap_is_clamped() {
    let ticker = Scripted::new("ticker", &["ticker"]).dynamic(None, None);
    let config = five_second_config()
        .dynamic_duration_cap(1e30)
        .normal_interval(1e30);
    let (mut scheduler, clock) = scheduler_with(vec![ticker], config);

    let stats = scheduler.run_for(Duration::from_secs(10));
    assert_eq!(stats.activations, 1);
    assert_eq!(clock.elapsed(), Duration::from_secs(10));
}
