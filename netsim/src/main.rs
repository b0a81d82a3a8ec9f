mod host;
mod link;
mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use controller::{
    advance, Controller, ControllerConfig, ControllerEvent, InputId, NetworkedController,
    Outgoing, PeerId, WireLimits,
};
use log::{info, warn};
use tools::{decode_packet_json, inspect_packet};

use crate::host::{bot_script, distance, SimHost, INPUT_BITS};
use crate::link::{Link, LinkConditions};
use crate::summary::Summary;

const MASTER: PeerId = PeerId::new(1);
const DOLL: PeerId = PeerId::new(2);

#[derive(Parser)]
#[command(
    name = "inputsync-netsim",
    version,
    about = "Deterministic player/server/doll simulation over a lossy link"
)]
struct Cli {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Fixed tick rate shared by every peer.
    #[arg(long, default_value_t = 60.0)]
    rate: f32,
    /// Probability that a message is lost.
    #[arg(long, default_value_t = 0.05)]
    loss: f32,
    /// Probability that a message arrives twice.
    #[arg(long, default_value_t = 0.02)]
    duplicate: f32,
    /// Upper bound of the random delay, in frames.
    #[arg(long, default_value_t = 3)]
    max_delay_frames: u32,
    /// Controller configuration as JSON. Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for the summary and captures.
    #[arg(long, default_value = "netsim-out")]
    out_dir: PathBuf,
    /// Write every packet the player sends under `<out-dir>/packets`.
    #[arg(long)]
    capture: bool,
    /// Fail if the final server divergence exceeds this distance.
    #[arg(long)]
    max_server_divergence: Option<f32>,
    /// Fail if the server ran more ghost ticks than this.
    #[arg(long)]
    max_ghost_ticks: Option<u32>,
    /// Fail if p95 packet size exceeds this value.
    #[arg(long)]
    max_p95_packet_bytes: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.rate.is_nan() || cli.rate <= 0.0 {
        anyhow::bail!("tick rate must be positive, got {}", cli.rate);
    }
    let config = load_config(cli.config.as_deref())?;

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create output dir {}", cli.out_dir.display()))?;
    let capture_dir = if cli.capture {
        let dir = cli.out_dir.join("packets");
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Some(dir)
    } else {
        None
    };

    let conditions = LinkConditions {
        loss: cli.loss,
        duplicate: cli.duplicate,
        max_delay_frames: cli.max_delay_frames,
    };
    info!(
        "simulating {} frames at {} Hz, seed {}, {:?}",
        cli.frames, cli.rate, cli.seed, conditions
    );

    let mut sim = Simulation::new(&cli, config, conditions, capture_dir)?;
    for _ in 0..cli.frames {
        sim.run_frame()?;
    }
    let summary = sim.finish();
    info!(
        "server applied {} inputs with {} ghost ticks, final divergence {:.3}",
        summary.server_new_inputs, summary.server_ghost_ticks, summary.final_server_divergence
    );

    write_summary_json(&cli.out_dir, &summary)?;
    summary.assert_budgets(
        cli.max_server_divergence,
        cli.max_ghost_ticks,
        cli.max_p95_packet_bytes,
    )?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    let Some(path) = path else {
        return Ok(ControllerConfig::default());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: ControllerConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parse controller config {}", path.display()))?;
    config.validate().context("invalid controller config")?;
    Ok(config)
}

fn write_packet(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

fn write_summary_json(out_dir: &Path, summary: &Summary) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Checks a packet the player just sent with the same parser the tools
/// CLI uses. Returns the newest input id it carries.
fn validate_packet(
    bytes: &[u8],
    limits: &WireLimits,
    previous: Option<u64>,
    newest: Option<InputId>,
) -> Result<u64> {
    let report = inspect_packet(bytes, INPUT_BITS, limits).context("inspect packet")?;
    let _ = decode_packet_json(bytes, INPUT_BITS, limits).context("tools decode")?;
    let last = report.last_id.context("packet carries no inputs")?;
    if previous.is_some_and(|previous| last <= previous) {
        anyhow::bail!("packet ends at {last}, not after {previous:?}");
    }
    if newest.map_or(true, |newest| last > newest.raw()) {
        anyhow::bail!("packet ends at {last}, past the captured {newest:?}");
    }
    Ok(last)
}

struct Simulation {
    frame: u64,
    rate: f32,
    delta: f32,
    sample_every: u64,
    limits: WireLimits,
    capture_dir: Option<PathBuf>,
    player: NetworkedController<SimHost>,
    server: NetworkedController<SimHost>,
    doll: NetworkedController<SimHost>,
    baseline: NetworkedController<SimHost>,
    to_server: Link<Vec<u8>>,
    to_player: Link<u8>,
    to_doll: Link<Vec<u8>>,
    acks: Link<InputId>,
    doll_acks: Link<InputId>,
    last_sent: Option<u64>,
    last_ack: Option<InputId>,
    held_doll_ack: Option<InputId>,
    summary: Summary,
}

impl Simulation {
    fn new(
        cli: &Cli,
        config: ControllerConfig,
        conditions: LinkConditions,
        capture_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut rng = fastrand::Rng::with_seed(cli.seed);
        // A few spare inputs for a player sped up by the server.
        let script = bot_script(&mut rng, cli.frames as usize * 2);

        let player = NetworkedController::player(SimHost::new(script.clone()), config.clone())
            .context("create player")?;
        let mut server =
            NetworkedController::server(SimHost::new(Vec::new()), config.clone(), MASTER)
                .context("create server")?;
        server
            .as_server_mut()
            .context("server role")?
            .peer_connected(DOLL);
        let doll = NetworkedController::doll(SimHost::new(Vec::new()), config)
            .context("create doll")?;
        let baseline = NetworkedController::no_net(SimHost::new(script));

        Ok(Self {
            frame: 0,
            rate: cli.rate,
            delta: 1.0 / cli.rate,
            sample_every: (cli.rate.round() as u64).max(1),
            limits: WireLimits::default(),
            capture_dir,
            player,
            server,
            doll,
            baseline,
            to_server: Link::new(conditions, rng.u64(..)),
            to_player: Link::new(conditions, rng.u64(..)),
            to_doll: Link::new(conditions, rng.u64(..)),
            acks: Link::new(conditions, rng.u64(..)),
            doll_acks: Link::new(conditions, rng.u64(..)),
            last_sent: None,
            last_ack: None,
            held_doll_ack: None,
            summary: Summary::new(cli.frames, cli.seed, cli.rate, conditions),
        })
    }

    fn run_frame(&mut self) -> Result<()> {
        self.player_frame()?;
        self.server_frame()?;
        self.doll_frame()?;
        if self.frame % self.sample_every == 0 {
            let speed = self.player.as_player().map_or(0.0, |player| player.tick_speed());
            self.summary.speed_bias_samples.push(speed);
        }
        self.frame += 1;
        Ok(())
    }

    fn player_frame(&mut self) -> Result<()> {
        let now = self.frame;
        for speed in self.to_player.poll(now) {
            self.player
                .receive_tick_speed(&[speed])
                .context("player tick speed")?;
            if let Some(player) = self.player.as_player() {
                self.summary.push_speed_bias(player.tick_speed());
            }
        }
        for id in self.acks.poll(now) {
            // Reordered acknowledgments are superseded by newer ones.
            if self.last_ack.is_some_and(|last| id <= last) {
                continue;
            }
            self.player
                .notify_input_checked(id)
                .context("player acknowledgment")?;
            self.last_ack = Some(id);
        }

        let report = advance(&mut self.player, self.delta, self.rate).context("player tick")?;
        self.summary.player_ticks += u64::from(report.sub_ticks);
        self.summary.throttled_ticks += u64::from(report.sub_ticks - report.new_inputs);

        let newest = self.player.current_input_id();
        let messages: Vec<_> = self.player.outbox().drain_messages().collect();
        for message in messages {
            match message {
                Outgoing::ServerInputs(packet) => {
                    let last = validate_packet(&packet, &self.limits, self.last_sent, newest)?;
                    self.last_sent = Some(last);
                    if let Some(dir) = &self.capture_dir {
                        let path = dir.join(format!("inputs_{:06}.bin", self.summary.packets_sent));
                        write_packet(&path, &packet)?;
                    }
                    self.summary.push_packet(packet.len() as u64);
                    self.to_server.send(now, packet);
                }
                other => warn!("player produced unexpected {other:?}"),
            }
        }

        let steps = self.player.host().steps();
        let predicted = self.player.host().position();
        let reference = self.reference_position(steps)?;
        self.summary.max_prediction_divergence = self
            .summary
            .max_prediction_divergence
            .max(distance(predicted, reference));
        Ok(())
    }

    fn server_frame(&mut self) -> Result<()> {
        let now = self.frame;
        for packet in self.to_server.poll(now) {
            self.server
                .receive_inputs(&packet)
                .context("server receive")?;
        }

        let report = advance(&mut self.server, self.delta, self.rate).context("server tick")?;
        self.summary.server_ticks += u64::from(report.sub_ticks);
        self.summary.server_new_inputs += u64::from(report.new_inputs);

        if let Some(id) = self.server.current_input_id() {
            self.acks.send(now, id);
            self.doll_acks.send(now, id);
            let reference = self.reference_position(id.raw() as usize + 1)?;
            let divergence = distance(self.server.host().position(), reference);
            self.summary.max_server_divergence =
                self.summary.max_server_divergence.max(divergence);
            self.summary.final_server_divergence = divergence;
        }

        let messages: Vec<_> = self.server.outbox().drain_messages().collect();
        for message in messages {
            match message {
                Outgoing::TickSpeed(speed) => self.to_player.send(now, speed),
                Outgoing::DollInputs { peer, packet } if peer == DOLL => {
                    self.to_doll.send(now, packet);
                }
                // Reliable channel.
                Outgoing::DollStatus { peer, open } if peer == DOLL => {
                    self.doll
                        .receive_doll_status(open)
                        .context("doll status")?;
                }
                other => warn!("server produced unexpected {other:?}"),
            }
        }
        Ok(())
    }

    fn doll_frame(&mut self) -> Result<()> {
        let now = self.frame;
        for packet in self.to_doll.poll(now) {
            self.doll.receive_inputs(&packet).context("doll receive")?;
        }
        for id in self.doll_acks.poll(now) {
            self.held_doll_ack = self.held_doll_ack.max(Some(id));
        }

        let report = advance(&mut self.doll, self.delta, self.rate).context("doll tick")?;
        self.summary.doll_new_inputs += u64::from(report.new_inputs);

        // Server state is only applied once the doll has played past it.
        let current = self.doll.current_input_id();
        if let Some(id) = self.held_doll_ack {
            if current.is_some_and(|current| current >= id) {
                self.doll
                    .notify_input_checked(id)
                    .context("doll acknowledgment")?;
                self.held_doll_ack = None;
            }
        }

        let events: Vec<_> = self.doll.outbox().drain_events().collect();
        for event in events {
            match event {
                ControllerEvent::DollCommunicationOpened => self.summary.doll_opened_events += 1,
                ControllerEvent::DollCommunicationClosed => self.summary.doll_closed_events += 1,
            }
        }

        if let Some(id) = current {
            let reference = self.reference_position(id.raw() as usize + 1)?;
            let divergence = distance(self.doll.host().position(), reference);
            self.summary.max_doll_divergence = self.summary.max_doll_divergence.max(divergence);
        }
        Ok(())
    }

    /// Position of the offline run after `steps` inputs, simulating more of
    /// it on demand.
    fn reference_position(&mut self, steps: usize) -> Result<[f32; 2]> {
        while self.baseline.host().steps() < steps {
            self.baseline
                .process(self.delta)
                .context("baseline tick")?;
        }
        Ok(self
            .baseline
            .host()
            .position_after(steps)
            .unwrap_or_default())
    }

    fn finish(mut self) -> Summary {
        self.summary.server_link = self.to_server.stats();
        self.summary.doll_link = self.to_doll.stats();
        self.summary.server_packets_in_flight = self.to_server.in_flight();
        self.summary.player_jumps = self.player.host().jumps();
        self.summary.server_jumps = self.server.host().jumps();
        self.summary.last_player_input = self.player.current_input_id().map(InputId::raw);
        self.summary.last_server_input = self.server.current_input_id().map(InputId::raw);
        self.summary.last_doll_input = self.doll.current_input_id().map(InputId::raw);
        if let Some(server) = self.server.as_server() {
            self.summary.server_ghost_ticks = server.reconciler().ghost_input_count();
            self.summary.server_missing_packets = server.reconciler().missing_packets();
        }
        self.summary.finalize();
        self.summary
    }
}
