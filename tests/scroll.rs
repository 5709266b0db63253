use approx::assert_relative_eq;
use display_scheduler::{ComposedImage, LoopMode, ScrollConfig, ScrollEngine};
use std::time::{Duration, Instant};

fn engine(mode: LoopMode, width: u32) -> ScrollEngine {
    let config = ScrollConfig::default()
        .velocity(50.0)
        .viewport_width(128)
        .loop_mode(mode)
        .smoothing_window(1);
    let mut engine = ScrollEngine::new(config);
    engine.set_content_width(width);
    engine
}

fn drive(engine: &mut ScrollEngine, fps: f64, seconds: f64) -> f64 {
    let start = Instant::now();
    let frames = (fps * seconds).round() as u64;
    let mut position = 0.0;
    for frame in 0..=frames {
        let now = start + Duration::from_secs_f64(frame as f64 / fps);
        if let Some(step) = engine.update(now) {
            position = step.position;
        }
    }
    position
}

#[test]
fn distance_is_independent_of_frame_rate() {
    let mut fast = engine(LoopMode::Modulo, 10_000);
    let mut slow = engine(LoopMode::Modulo, 10_000);

    let at_125 = drive(&mut fast, 125.0, 2.0);
    let at_60 = drive(&mut slow, 60.0, 2.0);

    assert_relative_eq!(at_125, 100.0, epsilon = 1e-3);
    assert_relative_eq!(at_60, 100.0, epsilon = 1e-3);
}

#[test]
fn modulo_position_stays_within_content() {
    let mut engine = engine(LoopMode::Modulo, 300);
    let deltas = [0.004, 0.008, 0.013, 0.02, 0.1, 0.5, 0.0, 0.0071];
    for i in 0..5_000 {
        let step = engine.advance(deltas[i % deltas.len()]);
        assert!(
            (0.0..300.0).contains(&step.position),
            "position {} escaped at frame {}",
            step.position,
            i
        );
    }
    assert!(engine.cycles() > 0);
}

#[test]
fn single_pass_saturates_and_completes_once() {
    let mut engine = engine(LoopMode::Single, 400);
    let mut completions = 0;
    for _ in 0..1_000 {
        if engine.advance(0.02).cycle_completed {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
    assert!(engine.is_halted());
    assert_relative_eq!(engine.position(), 272.0);
}

#[test]
fn stalled_frame_is_clamped() {
    let mut engine = engine(LoopMode::Modulo, 10_000);
    let start = Instant::now();
    engine.update(start);
    let step = engine.update(start + Duration::from_secs(3)).unwrap();
    assert_relative_eq!(step.position, 5.0, epsilon = 1e-9);
}

#[test]
fn visible_window_wraps_around_content_end() {
    let mut image = ComposedImage::new(200, 1);
    image.set_pixel(0, 0, [255, 0, 0]);
    image.set_pixel(199, 0, [0, 0, 255]);

    let config = ScrollConfig::default()
        .velocity(100.0)
        .viewport_width(16)
        .smoothing_window(1);
    let mut engine = ScrollEngine::new(config);
    engine.set_content(image);
    for _ in 0..19 {
        engine.advance(0.1);
    }
    assert_relative_eq!(engine.position(), 190.0, epsilon = 1e-9);

    let frame = engine.extract_visible().unwrap();
    assert_eq!(frame.width(), 16);
    assert_eq!(frame.pixel(9, 0), Some([0, 0, 255]));
    assert_eq!(frame.pixel(10, 0), Some([255, 0, 0]));
}

#[test]
fn estimated_duration_covers_one_pass() {
    let looping = engine(LoopMode::Modulo, 500);
    assert_relative_eq!(looping.estimated_duration(1.0, 60.0), 11.0, epsilon = 1e-9);

    let single = engine(LoopMode::Single, 500);
    // (500 - 128) / 50 * 1.1
    assert_relative_eq!(single.estimated_duration(1.0, 60.0), 8.184, epsilon = 1e-9);
}
