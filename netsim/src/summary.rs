use anyhow::Result;
use serde::Serialize;

use crate::link::{LinkConditions, LinkStats};

#[derive(Debug, Serialize)]
pub struct Summary {
    pub frames: u32,
    pub seed: u64,
    pub iterations_per_second: f32,
    pub link: LinkConditions,
    pub server_link: LinkStats,
    pub doll_link: LinkStats,
    pub packets_sent: u64,
    pub packet_bytes_total: u64,
    pub avg_packet_bytes: u64,
    pub p95_packet_bytes: u64,
    pub max_packet_bytes: u64,
    pub player_ticks: u64,
    pub throttled_ticks: u64,
    pub server_ticks: u64,
    pub server_new_inputs: u64,
    pub server_ghost_ticks: u32,
    pub server_missing_packets: usize,
    pub last_player_input: Option<u64>,
    pub last_server_input: Option<u64>,
    pub last_doll_input: Option<u64>,
    pub doll_new_inputs: u64,
    pub doll_opened_events: u32,
    pub doll_closed_events: u32,
    pub speed_notifications: u32,
    pub speed_bias_min: f32,
    pub speed_bias_max: f32,
    pub speed_bias_final: f32,
    /// Bias received by the player, one sample per second of simulation.
    pub speed_bias_samples: Vec<f32>,
    pub max_server_divergence: f32,
    pub final_server_divergence: f32,
    pub max_doll_divergence: f32,
    pub max_prediction_divergence: f32,
    /// Jumps each host simulated, ghost ticks included.
    pub player_jumps: u32,
    pub server_jumps: u32,
    /// Packets still on the way to the server when the run stopped.
    pub server_packets_in_flight: usize,
    #[serde(skip)]
    packet_sizes: Vec<u64>,
}

impl Summary {
    pub fn new(frames: u32, seed: u64, iterations_per_second: f32, link: LinkConditions) -> Self {
        Self {
            frames,
            seed,
            iterations_per_second,
            link,
            server_link: LinkStats::default(),
            doll_link: LinkStats::default(),
            packets_sent: 0,
            packet_bytes_total: 0,
            avg_packet_bytes: 0,
            p95_packet_bytes: 0,
            max_packet_bytes: 0,
            player_ticks: 0,
            throttled_ticks: 0,
            server_ticks: 0,
            server_new_inputs: 0,
            server_ghost_ticks: 0,
            server_missing_packets: 0,
            last_player_input: None,
            last_server_input: None,
            last_doll_input: None,
            doll_new_inputs: 0,
            doll_opened_events: 0,
            doll_closed_events: 0,
            speed_notifications: 0,
            speed_bias_min: 0.0,
            speed_bias_max: 0.0,
            speed_bias_final: 0.0,
            speed_bias_samples: Vec::new(),
            max_server_divergence: 0.0,
            final_server_divergence: 0.0,
            max_doll_divergence: 0.0,
            max_prediction_divergence: 0.0,
            player_jumps: 0,
            server_jumps: 0,
            server_packets_in_flight: 0,
            packet_sizes: Vec::new(),
        }
    }

    pub fn push_packet(&mut self, bytes: u64) {
        self.packets_sent += 1;
        self.packet_bytes_total += bytes;
        self.max_packet_bytes = self.max_packet_bytes.max(bytes);
        self.packet_sizes.push(bytes);
    }

    pub fn push_speed_bias(&mut self, bias: f32) {
        self.speed_notifications += 1;
        self.speed_bias_min = self.speed_bias_min.min(bias);
        self.speed_bias_max = self.speed_bias_max.max(bias);
        self.speed_bias_final = bias;
    }

    pub fn finalize(&mut self) {
        if self.packets_sent > 0 {
            self.avg_packet_bytes = self.packet_bytes_total / self.packets_sent;
            self.packet_sizes.sort_unstable();
            let idx = ((self.packet_sizes.len() as f64) * 0.95).ceil() as usize;
            let idx = idx.saturating_sub(1).min(self.packet_sizes.len() - 1);
            self.p95_packet_bytes = self.packet_sizes[idx];
        }
    }

    pub fn assert_budgets(
        &self,
        max_server_divergence: Option<f32>,
        max_ghost_ticks: Option<u32>,
        max_p95_bytes: Option<u64>,
    ) -> Result<()> {
        if let Some(max) = max_server_divergence {
            if self.final_server_divergence > max {
                anyhow::bail!(
                    "final server divergence {} exceeds budget {}",
                    self.final_server_divergence,
                    max
                );
            }
        }
        if let Some(max) = max_ghost_ticks {
            if self.server_ghost_ticks > max {
                anyhow::bail!(
                    "server ghost ticks {} exceed budget {}",
                    self.server_ghost_ticks,
                    max
                );
            }
        }
        if let Some(max) = max_p95_bytes {
            if self.p95_packet_bytes > max {
                anyhow::bail!(
                    "p95 packet bytes {} exceeds budget {}",
                    self.p95_packet_bytes,
                    max
                );
            }
        }
        Ok(())
    }
}
