mod common;

use common::{five_second_config, scheduler_with, Scripted};
use display_scheduler::{
    command_channel, CommandSender, ContentUnit, ManualClock, ModeScheduler, OnDemandRequest,
    SchedulerState, SessionStatus, SharedState, TickOutcome,
};
use std::sync::Arc;

fn unit(mode: &str, provider: &str) -> ContentUnit {
    ContentUnit::new(mode, provider)
}

fn setup(extra: Vec<Scripted>) -> (ModeScheduler, Arc<ManualClock>, CommandSender, SharedState) {
    let mut providers = vec![
        Scripted::new("clock", &["clock"]),
        Scripted::new("weather", &["weather_current", "weather_forecast"]),
    ];
    providers.extend(extra);
    let (scheduler, clock) = scheduler_with(providers, five_second_config());
    let (sender, receiver) = command_channel();
    let shared = SharedState::new();
    let scheduler = scheduler
        .with_command_receiver(receiver)
        .with_state_publisher(shared.clone());
    (scheduler, clock, sender, shared)
}

#[test]
fn timed_session_expires_and_rotation_resumes_at_captured_index() {
    let (mut scheduler, _clock, sender, shared) = setup(Vec::new());
    assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("clock", "clock")));
    assert_eq!(scheduler.rotation().current_index(), 1);

    sender.send(OnDemandRequest::start_mode("r1", "weather_forecast").with_duration(7.0));
    assert_eq!(
        scheduler.tick(),
        TickOutcome::Completed(unit("weather_forecast", "weather"))
    );
    assert_eq!(scheduler.state(), SchedulerState::OnDemand);
    assert_eq!(scheduler.rotation().current_index(), 1);

    let state = shared.latest().unwrap();
    assert!(state.active);
    assert_eq!(state.status, SessionStatus::Active);
    assert_eq!(state.mode.as_deref(), Some("weather_forecast"));
    assert_eq!(state.provider_id.as_deref(), Some("weather"));
    assert_eq!(state.requested_at, Some(1_700_000_005.0));
    assert_eq!(state.expires_at, Some(1_700_000_012.0));
    assert_eq!(state.remaining, Some(7.0));

    // Expires two seconds into the next window
    assert_eq!(
        scheduler.tick(),
        TickOutcome::Preempted(unit("weather_forecast", "weather"))
    );
    let state = shared.latest().unwrap();
    assert!(!state.active);
    assert_eq!(state.remaining, Some(0.0));
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.last_event.as_deref(), Some("expired"));
    assert_eq!(state.mode, None);

    assert_eq!(
        scheduler.tick(),
        TickOutcome::Completed(unit("weather_current", "weather"))
    );
    assert_eq!(scheduler.state(), SchedulerState::Rotating);
}

#[test]
fn pinned_session_stays_until_stopped() {
    let (mut scheduler, _clock, sender, shared) = setup(Vec::new());
    scheduler.tick();

    sender.send(
        OnDemandRequest::start_mode("pin", "clock")
            .with_duration(3.0)
            .pinned(),
    );
    for _ in 0..4 {
        assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("clock", "clock")));
    }
    let state = shared.latest().unwrap();
    assert!(state.active && state.pinned);
    assert_eq!(state.expires_at, None);
    assert_eq!(state.remaining, None);

    sender.send(OnDemandRequest::stop("unpin"));
    assert_eq!(
        scheduler.tick(),
        TickOutcome::Completed(unit("weather_current", "weather"))
    );
    let state = shared.latest().unwrap();
    assert!(!state.active);
    assert_eq!(state.last_event.as_deref(), Some("stopped"));
}

#[test]
fn invalid_command_sets_error_status_without_rotation_side_effects() {
    let (mut scheduler, _clock, sender, shared) = setup(Vec::new());

    sender
        .send_json(r#"{"request_id":"x1","action":"pause"}"#)
        .unwrap();
    assert!(!scheduler.poll_on_demand());

    let state = shared.latest().unwrap();
    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(state.error.as_deref(), Some("invalid_action"));
    assert_eq!(scheduler.rotation().current_index(), 0);
    assert_eq!(scheduler.rotation().advances(), 0);

    sender.send(OnDemandRequest::start_provider("x2", "weather"));
    assert!(scheduler.poll_on_demand());
    let state = shared.latest().unwrap();
    assert_eq!(state.status, SessionStatus::Active);
    assert_eq!(state.error, None);
    assert_eq!(state.mode.as_deref(), Some("weather_current"));
}

#[test]
fn rejected_command_keeps_running_session() {
    let (mut scheduler, _clock, sender, shared) = setup(Vec::new());
    sender.send(OnDemandRequest::start_mode("a", "clock").pinned());
    assert!(scheduler.poll_on_demand());

    sender.send(OnDemandRequest::start_mode("b", "no_such_mode"));
    assert!(!scheduler.poll_on_demand());

    let state = shared.latest().unwrap();
    assert!(state.active);
    assert_eq!(state.status, SessionStatus::Active);
    assert_eq!(state.error.as_deref(), Some("unknown_mode"));
    assert_eq!(state.last_event.as_deref(), Some("rejected"));
}

#[test]
fn repeated_request_id_is_ignored() {
    let (mut scheduler, _clock, sender, _shared) = setup(Vec::new());
    sender.send(OnDemandRequest::start_mode("same", "clock"));
    assert!(scheduler.poll_on_demand());
    sender.send(OnDemandRequest::stop("stop-1"));
    assert!(scheduler.poll_on_demand());

    sender.send(OnDemandRequest::start_mode("same", "clock"));
    sender.send(OnDemandRequest::stop("stop-1"));
    assert!(!scheduler.poll_on_demand());
    assert!(!scheduler.session().is_active());
}

#[test]
fn failing_on_demand_unit_ends_session_with_display_failed() {
    let (mut scheduler, _clock, sender, shared) =
        setup(vec![Scripted::new("broken", &["broken"]).failing()]);
    scheduler.tick();
    assert_eq!(scheduler.rotation().current_index(), 1);

    sender.send(OnDemandRequest::start_mode("r", "broken"));
    assert!(matches!(
        scheduler.tick(),
        TickOutcome::Failed(u, _) if u == unit("broken", "broken")
    ));

    let state = shared.latest().unwrap();
    assert!(!state.active);
    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(state.error.as_deref(), Some("display_failed"));
    assert_eq!(scheduler.rotation().current_index(), 1);
}

#[test]
fn command_preempts_rotation_within_one_interval() {
    let (scheduler, clock, sender, _shared) = setup(Vec::new());
    let trigger = clock.clone();
    let mut sent = false;
    let mut scheduler = scheduler.with_background(move || {
        if !sent && trigger.elapsed().as_secs() >= 2 {
            sender.send(OnDemandRequest::start_mode("late", "weather_forecast"));
            sent = true;
        }
    });

    assert_eq!(scheduler.tick(), TickOutcome::Preempted(unit("clock", "clock")));
    assert_eq!(clock.elapsed().as_secs(), 3);
    assert_eq!(scheduler.rotation().current_index(), 0);

    let active = scheduler.resolve_active_unit().unwrap();
    assert_eq!(active.unit, unit("weather_forecast", "weather"));
    assert_eq!(scheduler.stats().preemptions, 1);
}

#[test]
fn oversized_duration_is_rejected_as_invalid_payload() {
    let (mut scheduler, _clock, sender, shared) = setup(Vec::new());

    for (id, duration) in [("huge", "1e300"), ("overflow", "1e19")] {
        let json = format!(
            r#"{{"request_id":"{id}","action":"start","mode":"clock","duration":{duration}}}"#
        );
        sender.send_json(&json).unwrap();
        assert!(!scheduler.poll_on_demand());

        let state = shared.latest().unwrap();
        assert!(!state.active);
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.error.as_deref(), Some("invalid_payload"));
    }
    assert_eq!(scheduler.tick(), TickOutcome::Completed(unit("clock", "clock")));
    assert_eq!(scheduler.state(), SchedulerState::Rotating);
}
