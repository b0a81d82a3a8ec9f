//! Tuning knobs for the input pipeline.

use wire::{Limits, FIRST_ID_SIZE};

use crate::error::{ControllerError, ControllerResult};

/// Lower bound of the server's target queue depth.
pub const MIN_OPTIMAL_QUEUE_DEPTH: f32 = 2.0;

/// Largest speed bias, in ticks per second, the server may ask a peer to apply.
pub const MAX_ADDITIONAL_TICK_SPEED: f32 = 2.0;

/// Largest input payload, in bytes, a received packet is sized for.
pub const MAX_INPUT_BYTES: usize = 256;

/// Controller configuration shared by every role.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Inputs a player keeps until the server acknowledges them.
    pub player_input_storage_size: usize,
    /// Older inputs repeated in every packet besides the newest one.
    pub max_redundant_inputs: usize,
    /// Seconds between two speed notifications.
    pub tick_speedup_notification_delay: f32,
    /// Ticks remembered by the arrival tracer.
    pub network_traced_frames: usize,
    /// Misses tolerated before the target queue depth moves at full rate.
    pub missing_input_max_tolerance: usize,
    /// Gain applied to the speed bias.
    pub tick_acceleration: f32,
    /// Gain applied to the target queue depth.
    pub optimal_size_acceleration: f32,
    /// Upper bound of the server's target queue depth.
    pub server_input_storage_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            player_input_storage_size: 300,
            max_redundant_inputs: 50,
            tick_speedup_notification_delay: 0.33,
            network_traced_frames: 1200,
            missing_input_max_tolerance: 4,
            tick_acceleration: 2.0,
            optimal_size_acceleration: 2.5,
            server_input_storage_size: 30,
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration with small buffers for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            player_input_storage_size: 16,
            max_redundant_inputs: 4,
            tick_speedup_notification_delay: 0.1,
            network_traced_frames: 60,
            missing_input_max_tolerance: 4,
            tick_acceleration: 2.0,
            optimal_size_acceleration: 2.5,
            server_input_storage_size: 10,
        }
    }

    /// Decode limits large enough for any packet a player with this
    /// configuration sends.
    ///
    /// Never tighter than [`Limits::default`]. A packet carries at most
    /// `max_redundant_inputs + 1` runs of one count byte and one payload.
    #[must_use]
    pub fn wire_limits(&self) -> Limits {
        let floor = Limits::default();
        let runs = self.max_redundant_inputs.saturating_add(1);
        let run_bytes = runs.saturating_mul(MAX_INPUT_BYTES + 1);
        Limits {
            max_packet_bytes: floor
                .max_packet_bytes
                .max(FIRST_ID_SIZE.saturating_add(run_bytes)),
            max_inputs_per_packet: floor.max_inputs_per_packet.max(runs),
        }
    }

    /// Checks every field against its allowed range.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> ControllerResult<()> {
        let counts = [
            ("player_input_storage_size", self.player_input_storage_size, 1, 2000),
            ("max_redundant_inputs", self.max_redundant_inputs, 0, 1000),
            ("network_traced_frames", self.network_traced_frames, 1, 10_000),
            ("missing_input_max_tolerance", self.missing_input_max_tolerance, 1, 50),
            ("server_input_storage_size", self.server_input_storage_size, 2, 100),
        ];
        for (field, value, min, max) in counts {
            if !(min..=max).contains(&value) {
                return Err(ControllerError::InvalidConfig {
                    field,
                    value: value as f64,
                });
            }
        }

        let reals = [
            ("tick_speedup_notification_delay", self.tick_speedup_notification_delay, 2.0),
            ("tick_acceleration", self.tick_acceleration, 20.0),
            ("optimal_size_acceleration", self.optimal_size_acceleration, 20.0),
        ];
        for (field, value, max) in reals {
            if !(value > 0.0 && value <= max) {
                return Err(ControllerError::InvalidConfig {
                    field,
                    value: f64::from(value),
                });
            }
        }
        Ok(())
    }
}
