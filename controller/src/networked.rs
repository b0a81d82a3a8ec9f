//! The role-agnostic controller surface.

use crate::config::ControllerConfig;
use crate::doll::DollController;
use crate::error::{ControllerError, ControllerResult};
use crate::host::InputHost;
use crate::nonet::NoNetController;
use crate::outbox::Outbox;
use crate::player::PlayerController;
use crate::server::ServerController;
use crate::types::{InputId, PeerId, Role};

const fn unsupported(role: Role, operation: &'static str) -> ControllerError {
    ControllerError::RoleMismatch { role, operation }
}

/// Operations every role answers.
///
/// Operations a role never performs return
/// [`ControllerError::RoleMismatch`]; queries without an answer return
/// `None`.
pub trait Controller {
    fn role(&self) -> Role;

    /// Runs one tick of `delta` seconds.
    fn process(&mut self, delta: f32) -> ControllerResult<()>;

    /// Feeds a received redundant input packet. Returns how many new inputs
    /// were queued.
    fn receive_inputs(&mut self, _packet: &[u8]) -> ControllerResult<usize> {
        Err(unsupported(self.role(), "receive_inputs"))
    }

    /// How many ticks to run for `delta` seconds of wall time.
    fn sub_ticks(&mut self, delta: f32, iterations_per_second: f32) -> u32;

    /// Records that the server confirmed every input up to `id`.
    fn notify_input_checked(&mut self, _id: InputId) -> ControllerResult<()> {
        Err(unsupported(self.role(), "notify_input_checked"))
    }

    /// Newest input known to be on its way.
    fn last_known_input(&self) -> Option<InputId> {
        None
    }

    /// Id of the `index`-th stored input, oldest first.
    fn stored_input_id(&self, _index: usize) -> Option<InputId> {
        None
    }

    /// Re-applies the `index`-th stored input. Returns whether more stored
    /// inputs follow.
    fn process_instant(&mut self, _index: usize, _delta: f32) -> ControllerResult<bool> {
        Err(unsupported(self.role(), "process_instant"))
    }

    fn current_input_id(&self) -> Option<InputId>;

    /// Whether the last tick applied a fresh input rather than a repeat.
    fn has_new_input(&self) -> bool;

    /// Messages and events waiting for the host.
    fn outbox(&mut self) -> &mut Outbox;
}

/// A controller in one of its four roles.
#[derive(Debug)]
pub enum NetworkedController<H> {
    NoNet(NoNetController<H>),
    Player(PlayerController<H>),
    Server(ServerController<H>),
    Doll(DollController<H>),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            NetworkedController::NoNet($inner) => $body,
            NetworkedController::Player($inner) => $body,
            NetworkedController::Server($inner) => $body,
            NetworkedController::Doll($inner) => $body,
        }
    };
}

impl<H: InputHost> NetworkedController<H> {
    #[must_use]
    pub fn no_net(host: H) -> Self {
        Self::NoNet(NoNetController::new(host))
    }

    pub fn player(host: H, config: ControllerConfig) -> ControllerResult<Self> {
        PlayerController::new(host, config).map(Self::Player)
    }

    pub fn server(host: H, config: ControllerConfig, master: PeerId) -> ControllerResult<Self> {
        ServerController::new(host, config, master).map(Self::Server)
    }

    pub fn doll(host: H, config: ControllerConfig) -> ControllerResult<Self> {
        DollController::new(host, config).map(Self::Doll)
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        match self {
            Self::NoNet(inner) => inner.host(),
            Self::Player(inner) => inner.host(),
            Self::Server(inner) => inner.host(),
            Self::Doll(inner) => inner.host(),
        }
    }

    pub fn host_mut(&mut self) -> &mut H {
        dispatch!(self, inner => inner.host_mut())
    }

    #[must_use]
    pub const fn as_player(&self) -> Option<&PlayerController<H>> {
        match self {
            Self::Player(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerController<H>> {
        match self {
            Self::Player(inner) => Some(inner),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_server(&self) -> Option<&ServerController<H>> {
        match self {
            Self::Server(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_server_mut(&mut self) -> Option<&mut ServerController<H>> {
        match self {
            Self::Server(inner) => Some(inner),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_doll(&self) -> Option<&DollController<H>> {
        match self {
            Self::Doll(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_doll_mut(&mut self) -> Option<&mut DollController<H>> {
        match self {
            Self::Doll(inner) => Some(inner),
            _ => None,
        }
    }

    /// Applies a speed notification. Only players are governed.
    pub fn receive_tick_speed(&mut self, payload: &[u8]) -> ControllerResult<()> {
        match self {
            Self::Player(player) => player.receive_tick_speed(payload),
            other => Err(unsupported(other.role(), "receive_tick_speed")),
        }
    }

    /// Applies a doll flow notification. Only dolls have a flow.
    pub fn receive_doll_status(&mut self, open: bool) -> ControllerResult<()> {
        match self {
            Self::Doll(doll) => {
                doll.receive_doll_status(open);
                Ok(())
            }
            other => Err(unsupported(other.role(), "receive_doll_status")),
        }
    }
}

impl<H: InputHost> Controller for NetworkedController<H> {
    fn role(&self) -> Role {
        dispatch!(self, inner => inner.role())
    }

    fn process(&mut self, delta: f32) -> ControllerResult<()> {
        dispatch!(self, inner => inner.process(delta))
    }

    fn receive_inputs(&mut self, packet: &[u8]) -> ControllerResult<usize> {
        dispatch!(self, inner => inner.receive_inputs(packet))
    }

    fn sub_ticks(&mut self, delta: f32, iterations_per_second: f32) -> u32 {
        dispatch!(self, inner => inner.sub_ticks(delta, iterations_per_second))
    }

    fn notify_input_checked(&mut self, id: InputId) -> ControllerResult<()> {
        dispatch!(self, inner => inner.notify_input_checked(id))
    }

    fn last_known_input(&self) -> Option<InputId> {
        dispatch!(self, inner => inner.last_known_input())
    }

    fn stored_input_id(&self, index: usize) -> Option<InputId> {
        dispatch!(self, inner => inner.stored_input_id(index))
    }

    fn process_instant(&mut self, index: usize, delta: f32) -> ControllerResult<bool> {
        dispatch!(self, inner => inner.process_instant(index, delta))
    }

    fn current_input_id(&self) -> Option<InputId> {
        dispatch!(self, inner => inner.current_input_id())
    }

    fn has_new_input(&self) -> bool {
        dispatch!(self, inner => inner.has_new_input())
    }

    fn outbox(&mut self) -> &mut Outbox {
        dispatch!(self, inner => inner.outbox())
    }
}
