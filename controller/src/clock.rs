//! Adaptive tick rate.
//!
//! The server watches its queue of pending inputs for a peer and nudges that
//! peer's simulation speed so the queue stays short but never runs dry. Two
//! first-order controllers are chained: the target queue depth grows with
//! recent misses and shrinks when the queue is healthy, and the speed bias
//! accelerates toward that target with damping that only applies fully when
//! it does not fight the live acceleration.

use wire::encode_tick_speed;

use crate::config::{ControllerConfig, MAX_ADDITIONAL_TICK_SPEED, MIN_OPTIMAL_QUEUE_DEPTH};

/// Sign with zero counted as positive.
const fn sgn(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Server-side speed bias computation for one governed peer.
#[derive(Debug, Clone, Default)]
pub struct TickRateController {
    optimal_queue_depth: f32,
    speed_bias: f32,
    notification_timer: f32,
}

impl TickRateController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the target depth and the speed bias for one tick.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(
        &mut self,
        missing_packets: usize,
        pending_inputs: usize,
        delta: f32,
        config: &ControllerConfig,
    ) {
        let missing = missing_packets as f32;
        let pending = pending_inputs as f32;
        let tolerance = config.missing_input_max_tolerance as f32;
        let capacity = config.server_input_storage_size as f32;

        let depth_level = ((missing - pending) / tolerance).clamp(-2.0, 2.0);
        self.optimal_queue_depth += depth_level * config.optimal_size_acceleration * delta;
        self.optimal_queue_depth = self
            .optimal_queue_depth
            .clamp(MIN_OPTIMAL_QUEUE_DEPTH, capacity);

        let speed_level = ((self.optimal_queue_depth - pending) / capacity).clamp(-1.0, 1.0);
        let acceleration = speed_level * config.tick_acceleration * delta;
        let damping = self.speed_bias * -0.9;
        let blend = (sgn(acceleration) * sgn(damping) + 1.0) / 2.0;

        self.speed_bias += acceleration + damping * blend;
        self.speed_bias = self
            .speed_bias
            .clamp(-MAX_ADDITIONAL_TICK_SPEED, MAX_ADDITIONAL_TICK_SPEED);
    }

    /// Advances the notification timer; returns the speed byte to send once
    /// the configured delay has elapsed.
    pub fn poll_notification(&mut self, delta: f32, config: &ControllerConfig) -> Option<u8> {
        self.notification_timer += delta;
        if self.notification_timer < config.tick_speedup_notification_delay {
            return None;
        }
        self.notification_timer = 0.0;
        Some(encode_tick_speed(self.speed_bias, MAX_ADDITIONAL_TICK_SPEED))
    }

    #[must_use]
    pub const fn speed_bias(&self) -> f32 {
        self.speed_bias
    }

    #[must_use]
    pub const fn optimal_queue_depth(&self) -> f32 {
        self.optimal_queue_depth
    }
}

/// Fractional tick accumulator turning wall time into whole ticks.
#[derive(Debug, Clone, Default)]
pub struct SubTickClock {
    time_bank: f32,
}

impl SubTickClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Banks `delta` seconds and returns how many ticks of length
    /// `1 / (iterations_per_second + speed_bias)` it now covers.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sub_ticks(&mut self, delta: f32, iterations_per_second: f32, speed_bias: f32) -> u32 {
        self.time_bank += delta;
        let rate = iterations_per_second + speed_bias;
        if rate <= 0.0 {
            return 0;
        }
        let period = 1.0 / rate;
        let ticks = (self.time_bank / period).floor();
        self.time_bank -= ticks * period;
        ticks as u32
    }

    pub fn reset(&mut self) {
        self.time_bank = 0.0;
    }

    #[must_use]
    pub const fn time_bank(&self) -> f32 {
        self.time_bank
    }
}
