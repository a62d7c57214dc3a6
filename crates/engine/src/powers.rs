//! In-game powers.
//!
//! Powers arrive through "briefcases": at scheduled points of the game every
//! player is offered three descriptors drawn from the catalogue, rare ones
//! less often. A selected power either fires on the spot or sits in the
//! player's inventory until consumed. Timed powers stay active for a number
//! of clock ticks and must end exactly once, including when the room is torn
//! down mid-game.
//!
//! The factory owns scheduling, offers, and active-power lifecycles. The
//! concrete market and balance mutations live with the room, which owns the
//! simulator; an activation returns the saved state (previous volatility,
//! the disabled participants) the room needs to undo the effect on end.

use pit_core::{Cash, GameRng, ParticipantId};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Who a power acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerTarget {
    /// The initiating player only.
    Client,
    /// Every player.
    All,
    /// The market itself.
    Market,
    /// Every player except the initiator.
    Others,
}

/// The five implemented powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerKind {
    VolatilityStorm,
    RumorMill,
    CashHeritage,
    TheHomelessGift,
    TheHackerDdos,
}

/// Catalogue entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSpec {
    pub kind: PowerKind,
    pub title: &'static str,
    pub description: &'static str,
    /// Higher is rarer; offers are weighted by `1 / rarity`.
    pub rarity: u32,
    pub target: PowerTarget,
    pub is_instant: bool,
    pub price: Cash,
    pub duration_ticks: u32,
}

pub const CATALOGUE: &[PowerSpec] = &[
    PowerSpec {
        kind: PowerKind::VolatilityStorm,
        title: "Volatility storm",
        description: "Quadruples market volatility for a while.",
        rarity: 4,
        target: PowerTarget::Market,
        is_instant: false,
        price: Cash::from_int(500),
        duration_ticks: 20,
    },
    PowerSpec {
        kind: PowerKind::RumorMill,
        title: "Rumor mill",
        description: "Plants a market rumour with unpredictable impact.",
        rarity: 2,
        target: PowerTarget::Market,
        is_instant: false,
        price: Cash::from_int(250),
        duration_ticks: 0,
    },
    PowerSpec {
        kind: PowerKind::CashHeritage,
        title: "Cash heritage",
        description: "A distant relative leaves you a fortune.",
        rarity: 5,
        target: PowerTarget::Client,
        is_instant: true,
        price: Cash::from_int(1_000),
        duration_ticks: 0,
    },
    PowerSpec {
        kind: PowerKind::TheHomelessGift,
        title: "The homeless gift",
        description: "A stranger hands you a dollar. Every bit helps.",
        rarity: 1,
        target: PowerTarget::Client,
        is_instant: true,
        price: Cash::ZERO,
        duration_ticks: 0,
    },
    PowerSpec {
        kind: PowerKind::TheHackerDdos,
        title: "The hacker",
        description: "Knocks everyone else's trading terminal offline.",
        rarity: 6,
        target: PowerTarget::Others,
        is_instant: false,
        price: Cash::from_int(750),
        duration_ticks: 15,
    },
];

pub fn spec_for(kind: PowerKind) -> &'static PowerSpec {
    CATALOGUE
        .iter()
        .find(|s| s.kind == kind)
        .unwrap_or(&CATALOGUE[0])
}

/// A power held in a player's inventory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerInstance {
    pub id: Uuid,
    pub kind: PowerKind,
}

/// State saved at activation so the effect can be undone on end.
#[derive(Debug, Clone, PartialEq)]
pub enum PowerState {
    None,
    /// Volatility before the storm.
    SavedVolatility(f64),
    /// Participants whose trading was disabled.
    DisabledClients(Vec<ParticipantId>),
}

/// A timed power currently running.
#[derive(Debug, Clone)]
pub struct ActivePower {
    pub instance_id: Uuid,
    pub kind: PowerKind,
    pub initiator: ParticipantId,
    pub duration_ticks: u32,
    pub ticks_elapsed: u32,
    pub state: PowerState,
}

impl ActivePower {
    pub fn exhausted(&self) -> bool {
        self.ticks_elapsed >= self.duration_ticks
    }
}

/// Number of descriptors per briefcase offer.
pub const OFFER_SIZE: usize = 3;

/// Maximum briefcases per game.
const MAX_BRIEFCASES: usize = 8;

/// Minimum spacing between briefcases, and the margin kept clear at both
/// ends of the game, in seconds.
const BRIEFCASE_SPACING_SECS: u64 = 10;

/// Compute the briefcase timestamps for a game of `duration_secs`.
///
/// Up to 8 timestamps, spaced at least 10 s apart, the last at least 10 s
/// before the end of the game.
pub fn briefcase_schedule(duration_secs: u64) -> Vec<u64> {
    let usable = duration_secs.saturating_sub(2 * BRIEFCASE_SPACING_SECS);
    let count = ((usable / BRIEFCASE_SPACING_SECS) as usize).min(MAX_BRIEFCASES);
    if count == 0 {
        return Vec::new();
    }
    let step = usable / count as u64;
    (0..count)
        .map(|i| BRIEFCASE_SPACING_SECS + i as u64 * step)
        .collect()
}

/// Draw `k` pairwise-distinct descriptors, weighted by inverse rarity.
pub fn sample_offer(rng: &mut GameRng, k: usize) -> Vec<&'static PowerSpec> {
    let mut pool: Vec<&'static PowerSpec> = CATALOGUE.iter().collect();
    let mut offer = Vec::with_capacity(k);

    while offer.len() < k && !pool.is_empty() {
        let total: f64 = pool.iter().map(|s| 1.0 / s.rarity as f64).sum();
        let mut draw = rng.uniform() * total;
        let mut picked = pool.len() - 1;
        for (i, spec) in pool.iter().enumerate() {
            let w = 1.0 / spec.rarity as f64;
            if draw < w {
                picked = i;
                break;
            }
            draw -= w;
        }
        offer.push(pool.remove(picked));
    }

    offer
}

#[derive(Debug)]
pub struct PowerFactory {
    rng: GameRng,
    schedule: Vec<u64>,
    next_briefcase: usize,
    pending_offers: HashMap<ParticipantId, Vec<&'static PowerSpec>>,
    active: Vec<ActivePower>,
}

impl PowerFactory {
    pub fn new(duration_secs: u64, rng: GameRng) -> Self {
        Self {
            rng,
            schedule: briefcase_schedule(duration_secs),
            next_briefcase: 0,
            pending_offers: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// A uniform draw from the factory's generator, for effect magnitudes.
    pub fn draw_uniform(&mut self) -> f64 {
        self.rng.uniform()
    }

    pub fn schedule(&self) -> &[u64] {
        &self.schedule
    }

    pub fn active(&self) -> &[ActivePower] {
        &self.active
    }

    /// Has the next briefcase time elapsed? Advances the schedule cursor.
    pub fn briefcase_due(&mut self, elapsed_secs: u64) -> bool {
        match self.schedule.get(self.next_briefcase) {
            Some(&at) if elapsed_secs >= at => {
                self.next_briefcase += 1;
                true
            }
            _ => false,
        }
    }

    /// Build a briefcase offer for one player, replacing any unanswered one.
    pub fn make_offer(&mut self, client: ParticipantId) -> Vec<&'static PowerSpec> {
        let offer = sample_offer(&mut self.rng, OFFER_SIZE);
        self.pending_offers.insert(client, offer.clone());
        offer
    }

    /// Resolve a `POWER_SELECT` reply. The offer is single-use.
    pub fn take_selection(
        &mut self,
        client: &ParticipantId,
        index: usize,
    ) -> Option<&'static PowerSpec> {
        let offer = self.pending_offers.remove(client)?;
        offer.get(index).copied()
    }

    /// Register a consumed timed power as active.
    pub fn activate(
        &mut self,
        instance_id: Uuid,
        kind: PowerKind,
        initiator: ParticipantId,
        state: PowerState,
    ) {
        let duration_ticks = spec_for(kind).duration_ticks;
        self.active.push(ActivePower {
            instance_id,
            kind,
            initiator,
            duration_ticks,
            ticks_elapsed: 0,
            state,
        });
    }

    /// Advance active powers one clock tick; powers whose duration elapsed
    /// are removed and returned so the room can run their end effects.
    pub fn on_clock_tick(&mut self) -> Vec<ActivePower> {
        for p in &mut self.active {
            p.ticks_elapsed += 1;
        }
        let (done, live) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|p| p.exhausted());
        self.active = live;
        done
    }

    /// Remove and return every active power. Called on room disposal so end
    /// effects still run exactly once.
    pub fn drain_active(&mut self) -> Vec<ActivePower> {
        std::mem::take(&mut self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_spacing_and_margins() {
        for duration in [60u64, 120, 300, 3600] {
            let schedule = briefcase_schedule(duration);
            assert!(schedule.len() <= MAX_BRIEFCASES);
            assert!(!schedule.is_empty(), "duration {duration}");
            for window in schedule.windows(2) {
                assert!(window[1] - window[0] >= BRIEFCASE_SPACING_SECS);
            }
            assert!(*schedule.first().unwrap() >= BRIEFCASE_SPACING_SECS);
            assert!(*schedule.last().unwrap() <= duration - BRIEFCASE_SPACING_SECS);
        }
    }

    #[test]
    fn test_short_game_gets_no_briefcases() {
        assert!(briefcase_schedule(15).is_empty());
    }

    #[test]
    fn test_offers_are_pairwise_distinct() {
        let mut rng = GameRng::new(42);
        for _ in 0..200 {
            let offer = sample_offer(&mut rng, OFFER_SIZE);
            assert_eq!(offer.len(), OFFER_SIZE);
            for i in 0..offer.len() {
                for j in i + 1..offer.len() {
                    assert_ne!(offer[i].kind, offer[j].kind);
                }
            }
        }
    }

    #[test]
    fn test_rarity_weighting_favours_common_powers() {
        let mut rng = GameRng::new(7);
        let mut first_pick = HashMap::new();
        for _ in 0..2000 {
            let offer = sample_offer(&mut rng, 1);
            *first_pick.entry(offer[0].kind).or_insert(0u32) += 1;
        }
        // rarity 1 vs rarity 6: the gift should come up far more often.
        let gift = first_pick
            .get(&PowerKind::TheHomelessGift)
            .copied()
            .unwrap_or(0);
        let hacker = first_pick
            .get(&PowerKind::TheHackerDdos)
            .copied()
            .unwrap_or(0);
        assert!(gift > hacker * 2, "gift {gift} hacker {hacker}");
    }

    #[test]
    fn test_selection_consumes_offer() {
        let mut factory = PowerFactory::new(300, GameRng::new(1));
        let client = ParticipantId::new("c1");
        let offer = factory.make_offer(client.clone());

        let picked = factory.take_selection(&client, 1).unwrap();
        assert_eq!(picked.kind, offer[1].kind);
        assert!(factory.take_selection(&client, 1).is_none());
    }

    #[test]
    fn test_briefcase_cursor_advances() {
        let mut factory = PowerFactory::new(300, GameRng::new(1));
        let first = factory.schedule()[0];
        assert!(!factory.briefcase_due(first - 1));
        assert!(factory.briefcase_due(first));
        assert!(!factory.briefcase_due(first));
    }

    #[test]
    fn test_active_power_ends_after_duration() {
        let mut factory = PowerFactory::new(300, GameRng::new(1));
        factory.activate(
            Uuid::new_v4(),
            PowerKind::TheHackerDdos,
            ParticipantId::new("c1"),
            PowerState::DisabledClients(vec![ParticipantId::new("c2")]),
        );

        let duration = spec_for(PowerKind::TheHackerDdos).duration_ticks;
        for _ in 0..duration - 1 {
            assert!(factory.on_clock_tick().is_empty());
        }
        let ended = factory.on_clock_tick();
        assert_eq!(ended.len(), 1);
        assert!(factory.active().is_empty());
        // A further tick must not end it again.
        assert!(factory.on_clock_tick().is_empty());
    }

    #[test]
    fn test_drain_returns_active_once() {
        let mut factory = PowerFactory::new(300, GameRng::new(1));
        factory.activate(
            Uuid::new_v4(),
            PowerKind::VolatilityStorm,
            ParticipantId::new("c1"),
            PowerState::SavedVolatility(0.05),
        );

        let drained = factory.drain_active();
        assert_eq!(drained.len(), 1);
        assert!(factory.drain_active().is_empty());
        assert!(factory.on_clock_tick().is_empty());
    }
}
