//! Seeded unreliable link: loss, duplication and variable delay.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkConditions {
    /// Probability that a message is lost.
    pub loss: f32,
    /// Probability that a delivered message arrives twice.
    pub duplicate: f32,
    /// Upper bound of the per-message delay, in frames. Messages with
    /// different delays overtake each other.
    pub max_delay_frames: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub delivered: u64,
}

#[derive(Debug)]
pub struct Link<T> {
    conditions: LinkConditions,
    rng: fastrand::Rng,
    in_flight: Vec<(u64, u64, T)>,
    next_seq: u64,
    stats: LinkStats,
}

impl<T: Clone> Link<T> {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: fastrand::Rng::with_seed(seed),
            in_flight: Vec::new(),
            next_seq: 0,
            stats: LinkStats::default(),
        }
    }

    pub fn send(&mut self, now: u64, message: T) {
        self.stats.sent += 1;
        if self.rng.f32() < self.conditions.loss {
            self.stats.dropped += 1;
            return;
        }
        let copies = if self.rng.f32() < self.conditions.duplicate {
            self.stats.duplicated += 1;
            2
        } else {
            1
        };
        for _ in 0..copies {
            let delay = self.rng.u32(0..=self.conditions.max_delay_frames);
            self.in_flight
                .push((now + u64::from(delay), self.next_seq, message.clone()));
            self.next_seq += 1;
        }
    }

    /// Messages due at `now`, in arrival order.
    pub fn poll(&mut self, now: u64) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|(arrival, _, _)| *arrival <= now);
        self.in_flight = pending;
        due.sort_by_key(|(arrival, seq, _)| (*arrival, *seq));
        self.stats.delivered += due.len() as u64;
        due.into_iter().map(|(_, _, message)| message).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub const fn stats(&self) -> LinkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERFECT: LinkConditions = LinkConditions {
        loss: 0.0,
        duplicate: 0.0,
        max_delay_frames: 0,
    };

    #[test]
    fn perfect_link_delivers_in_order() {
        let mut link = Link::new(PERFECT, 1);
        link.send(0, 'a');
        link.send(0, 'b');
        assert_eq!(link.poll(0), vec!['a', 'b']);
        assert_eq!(link.in_flight(), 0);
        assert_eq!(link.stats().delivered, 2);
    }

    #[test]
    fn total_loss_drops_everything() {
        let mut link = Link::new(
            LinkConditions {
                loss: 1.0,
                ..PERFECT
            },
            1,
        );
        for now in 0..10 {
            link.send(now, now);
        }
        assert!(link.poll(100).is_empty());
        assert_eq!(link.stats().dropped, 10);
    }

    #[test]
    fn delayed_messages_wait() {
        let mut link = Link::new(
            LinkConditions {
                max_delay_frames: 5,
                duplicate: 1.0,
                ..PERFECT
            },
            7,
        );
        link.send(0, 1u8);
        assert_eq!(link.in_flight(), 2);
        let mut received = Vec::new();
        for now in 0..=5 {
            received.extend(link.poll(now));
        }
        assert_eq!(received, vec![1, 1]);
        assert_eq!(link.stats().duplicated, 1);
    }

    #[test]
    fn same_seed_same_fate() {
        let conditions = LinkConditions {
            loss: 0.3,
            duplicate: 0.1,
            max_delay_frames: 3,
        };
        let run = |seed| {
            let mut link = Link::new(conditions, seed);
            (0..50u64)
                .flat_map(|now| {
                    link.send(now, now);
                    link.poll(now)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }
}
