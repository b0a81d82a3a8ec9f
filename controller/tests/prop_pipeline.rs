//! Property tests for the player to server path over a hostile link.

mod common;

use common::{config, drain_server_inputs, record_new_input, Step, WalkHost};
use controller::{Controller, InputId, PeerId, PlayerController, ServerController};
use proptest::prelude::*;

const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy)]
enum Link {
    Deliver,
    Drop,
    Duplicate,
    Delay,
}

fn link_strategy() -> impl Strategy<Value = Link> {
    prop_oneof![
        5 => Just(Link::Deliver),
        2 => Just(Link::Drop),
        1 => Just(Link::Duplicate),
        1 => Just(Link::Delay),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    // Narrow ranges so neighbours repeat and runs form.
    (prop::bool::weighted(0.1), -2i64..3).prop_map(|(jump, heading)| Step::new(jump, heading))
}

proptest! {
    #[test]
    fn prop_server_replays_a_faithful_subsequence(
        script in prop::collection::vec(step_strategy(), 1..150),
        links in prop::collection::vec(link_strategy(), 150),
    ) {
        let mut player = PlayerController::new(WalkHost::new(script.clone()), config()).unwrap();
        let mut server = ServerController::new(WalkHost::default(), config(), PeerId::new(1)).unwrap();
        let mut log: Vec<(InputId, Step)> = Vec::new();
        let mut delayed: Vec<Vec<u8>> = Vec::new();
        let mut newest_delivered: Option<InputId> = None;

        for link in links.iter().take(script.len()) {
            player.process(DT).unwrap();
            let newest = player.current_input_id();
            let mut arrivals = std::mem::take(&mut delayed);
            for packet in drain_server_inputs(&mut player) {
                match link {
                    Link::Deliver => arrivals.push(packet),
                    Link::Drop => {}
                    Link::Duplicate => {
                        arrivals.push(packet.clone());
                        arrivals.push(packet);
                    }
                    Link::Delay => delayed.push(packet),
                }
                if !matches!(link, Link::Drop) {
                    newest_delivered = newest_delivered.max(newest);
                }
            }
            for packet in &arrivals {
                server.receive_inputs(packet).unwrap();
                // A repeat never queues anything.
                prop_assert_eq!(server.receive_inputs(packet).unwrap(), 0);
            }

            server.process(DT).unwrap();
            record_new_input(&server, &server.host().applied, &mut log);
            if let Some(id) = server.current_input_id() {
                player.notify_input_checked(id).unwrap();
            }
        }
        for packet in std::mem::take(&mut delayed) {
            server.receive_inputs(&packet).unwrap();
        }
        for _ in 0..400 {
            server.process(DT).unwrap();
            record_new_input(&server, &server.host().applied, &mut log);
        }

        for pair in log.windows(2) {
            prop_assert!(pair[0].0 < pair[1].0);
        }
        for (id, step) in &log {
            prop_assert_eq!(script[id.raw() as usize], *step);
        }
        prop_assert!(server.reconciler().pending().is_empty());
        prop_assert_eq!(server.current_input_id(), newest_delivered);
    }

    #[test]
    fn prop_player_store_never_exceeds_capacity(
        capacity in 1usize..8,
        ticks in 1usize..40,
        ack_every in 1usize..6,
    ) {
        let config = controller::ControllerConfig {
            player_input_storage_size: capacity,
            ..config()
        };
        let script: Vec<Step> = (0..ticks).map(|i| Step::new(false, i as i64)).collect();
        let mut player = PlayerController::new(WalkHost::new(script), config).unwrap();
        for tick in 0..ticks {
            player.process(DT).unwrap();
            prop_assert!(player.stored_input_count() <= capacity);
            if tick % ack_every == 0 {
                if let Some(oldest) = player.stored_input_id(0) {
                    player.notify_input_checked(oldest).unwrap();
                }
            }
        }
        // Prediction never stalls, even while throttled.
        prop_assert_eq!(player.host().applied.len(), ticks);
    }
}
