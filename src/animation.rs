//! Keyframe animation for panel opacity
//!
//! A `Chain` is a start value followed by eased keyframes. `Fade` plays a
//! chain against wall-clock instants; the owning controller samples it on
//! every frame tick and pushes the value to the window backend.

use std::time::{Duration, Instant};

/// Easing function type
pub type EasingFn = fn(f32) -> f32;

/// Decelerating to zero velocity
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Accelerating from zero velocity
pub fn ease_in_cubic(t: f32) -> f32 {
    t.powi(3)
}

/// A single keyframe in an animation
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Target value at this keyframe
    pub value: f32,
    /// Duration to reach this keyframe from the previous one
    pub duration: Duration,
    pub easing: EasingFn,
}

/// A chain of keyframes forming a complete animation
#[derive(Debug, Clone)]
pub struct Chain {
    keyframes: Vec<Keyframe>,
    start_value: f32,
}

impl Chain {
    pub fn new(start_value: f32) -> Self {
        Self {
            keyframes: Vec::new(),
            start_value,
        }
    }

    /// Add a keyframe to animate to `value` over `duration` with `easing`
    pub fn then_eased(mut self, value: f32, duration: Duration, easing: EasingFn) -> Self {
        self.keyframes.push(Keyframe {
            value,
            duration,
            easing,
        });
        self
    }

    pub fn total_duration(&self) -> Duration {
        self.keyframes.iter().map(|k| k.duration).sum()
    }

    pub fn end_value(&self) -> f32 {
        self.keyframes
            .last()
            .map(|k| k.value)
            .unwrap_or(self.start_value)
    }

    pub fn value_at(&self, elapsed: Duration) -> f32 {
        let elapsed = elapsed.min(self.total_duration());
        let mut accumulated = Duration::ZERO;
        let mut prev_value = self.start_value;

        for keyframe in &self.keyframes {
            let segment_end = accumulated + keyframe.duration;

            if elapsed < segment_end {
                let segment_elapsed = elapsed - accumulated;
                let t = (segment_elapsed.as_secs_f64() / keyframe.duration.as_secs_f64()) as f32;
                let eased_t = (keyframe.easing)(t.clamp(0.0, 1.0));
                return prev_value + (keyframe.value - prev_value) * eased_t;
            }

            accumulated = segment_end;
            prev_value = keyframe.value;
        }

        self.end_value()
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Opacity animation started at a known instant
#[derive(Debug, Clone)]
pub struct Fade {
    pub direction: FadeDirection,
    chain: Chain,
    started_at: Instant,
}

impl Fade {
    /// Fade toward 1.0 with an ease-out curve.
    ///
    /// Starting part way (reversing a fade out) shortens the duration in
    /// proportion so the perceived speed stays constant.
    pub fn fade_in(from: f32, duration: Duration, now: Instant) -> Self {
        let from = unit(from);
        Self {
            direction: FadeDirection::In,
            chain: Chain::new(from).then_eased(1.0, scaled(duration, 1.0 - from), ease_out_cubic),
            started_at: now,
        }
    }

    /// Fade toward 0.0 with an ease-in curve
    pub fn fade_out(from: f32, duration: Duration, now: Instant) -> Self {
        let from = unit(from);
        Self {
            direction: FadeDirection::Out,
            chain: Chain::new(from).then_eased(0.0, scaled(duration, from), ease_in_cubic),
            started_at: now,
        }
    }

    pub fn value_at(&self, now: Instant) -> f32 {
        self.chain
            .value_at(now.saturating_duration_since(self.started_at))
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.chain
            .is_complete(now.saturating_duration_since(self.started_at))
    }
}

fn scaled(duration: Duration, factor: f32) -> Duration {
    Duration::from_secs_f64(duration.as_secs_f64() * f64::from(factor))
}

fn unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
