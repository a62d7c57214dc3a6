//! In-game news events.
//!
//! The factory periodically publishes a themed bulletin drawn from a fixed
//! catalogue. A bulletin can carry a market effect (a guide-price shock or a
//! fundamental repricing) which the simulator applies when the item fires.
//! Items then age tick by tick until exhausted and move to the archive.
//!
//! All timing runs on game time, so a paused room neither ages items nor
//! brings the next bulletin closer.

use pit_core::GameRng;

/// Market impact attached to a news item, applied when it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewsEffect {
    /// Transient drift shock on the guide price.
    GuideShock { intensity: f64, duration_ticks: u32 },
    /// Permanent fundamental repricing by a fraction.
    IntrinsicShock { pct: f64 },
    /// Pure flavour, no market impact.
    None,
}

/// Template the factory instantiates items from.
#[derive(Debug, Clone, Copy)]
pub struct NewsDescriptor {
    pub title: &'static str,
    pub description: &'static str,
    pub duration_ticks: u32,
    pub effect: NewsEffect,
}

/// A fired news item.
#[derive(Debug, Clone)]
pub struct NewsItem {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub duration_ticks: u32,
    pub ticks_elapsed: u32,
    pub effect: NewsEffect,
}

impl NewsItem {
    pub fn exhausted(&self) -> bool {
        self.ticks_elapsed >= self.duration_ticks
    }
}

/// Themed catalogue. Durations are clock ticks the story stays "developing".
const CATALOGUE: &[NewsDescriptor] = &[
    NewsDescriptor {
        title: "Earnings beat expectations",
        description: "Quarterly results come in well ahead of consensus.",
        duration_ticks: 10,
        effect: NewsEffect::GuideShock {
            intensity: 0.02,
            duration_ticks: 10,
        },
    },
    NewsDescriptor {
        title: "CEO resigns unexpectedly",
        description: "Leadership vacuum rattles investors.",
        duration_ticks: 12,
        effect: NewsEffect::GuideShock {
            intensity: -0.025,
            duration_ticks: 12,
        },
    },
    NewsDescriptor {
        title: "Regulator opens inquiry",
        description: "A formal probe into accounting practices begins.",
        duration_ticks: 15,
        effect: NewsEffect::IntrinsicShock { pct: -0.08 },
    },
    NewsDescriptor {
        title: "Breakthrough product announced",
        description: "A new flagship line impresses early reviewers.",
        duration_ticks: 15,
        effect: NewsEffect::IntrinsicShock { pct: 0.1 },
    },
    NewsDescriptor {
        title: "Short seller publishes report",
        description: "A widely-followed fund questions the valuation.",
        duration_ticks: 8,
        effect: NewsEffect::GuideShock {
            intensity: -0.03,
            duration_ticks: 8,
        },
    },
    NewsDescriptor {
        title: "Index inclusion rumoured",
        description: "Passive inflows expected if the rumour holds.",
        duration_ticks: 10,
        effect: NewsEffect::GuideShock {
            intensity: 0.015,
            duration_ticks: 10,
        },
    },
    NewsDescriptor {
        title: "Analyst day goes quietly",
        description: "Guidance reiterated; nothing new to trade on.",
        duration_ticks: 5,
        effect: NewsEffect::None,
    },
];

/// Minimum / maximum delay between random bulletins, in game seconds.
const MIN_DELAY_SECS: u64 = 15;
const MAX_DELAY_SECS: u64 = 45;

/// Result of a clock tick: an item may have fired.
#[derive(Debug, Default)]
pub struct NewsTick {
    /// Newly published item, if the schedule elapsed this tick.
    pub published: Option<NewsItem>,
}

#[derive(Debug)]
pub struct NewsFactory {
    rng: GameRng,
    enabled: bool,
    next_fire_at_secs: Option<u64>,
    active: Vec<NewsItem>,
    archive: Vec<NewsItem>,
    next_id: u64,
}

impl NewsFactory {
    pub fn new(enabled: bool, mut rng: GameRng) -> Self {
        let next_fire_at_secs = enabled.then(|| Self::draw_delay(&mut rng));
        Self {
            rng,
            enabled,
            next_fire_at_secs,
            active: Vec::new(),
            archive: Vec::new(),
            next_id: 1,
        }
    }

    fn draw_delay(rng: &mut GameRng) -> u64 {
        rng.range_u64(MIN_DELAY_SECS, MAX_DELAY_SECS)
    }

    pub fn active(&self) -> &[NewsItem] {
        &self.active
    }

    pub fn archive(&self) -> &[NewsItem] {
        &self.archive
    }

    /// Advance one game second: age active items, retire exhausted ones,
    /// and fire the next random bulletin when its time arrives.
    pub fn on_clock_tick(&mut self, elapsed_secs: u64) -> NewsTick {
        for item in &mut self.active {
            item.ticks_elapsed += 1;
        }
        let (done, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.active)
                .into_iter()
                .partition(|i| i.exhausted());
        self.active = live;
        self.archive.extend(done);

        let mut tick = NewsTick::default();
        if self.enabled && self.next_fire_at_secs.is_some_and(|at| elapsed_secs >= at) {
            let descriptor = CATALOGUE[self.rng.pick_index(CATALOGUE.len())];
            tick.published = Some(self.publish(descriptor));
            self.next_fire_at_secs = Some(elapsed_secs + Self::draw_delay(&mut self.rng));
        }
        tick
    }

    /// Publish an item immediately (used by powers as well as the random
    /// schedule). The returned item carries the effect for the caller to
    /// apply.
    pub fn publish(&mut self, descriptor: NewsDescriptor) -> NewsItem {
        self.inject(
            descriptor.title.to_string(),
            descriptor.description.to_string(),
            descriptor.duration_ticks,
            descriptor.effect,
        )
    }

    /// Publish a fully custom item.
    pub fn inject(
        &mut self,
        title: String,
        description: String,
        duration_ticks: u32,
        effect: NewsEffect,
    ) -> NewsItem {
        let item = NewsItem {
            id: self.next_id,
            title,
            description,
            duration_ticks,
            ticks_elapsed: 0,
            effect,
        };
        self.next_id += 1;
        if item.exhausted() {
            self.archive.push(item.clone());
        } else {
            self.active.push(item.clone());
        }
        item
    }

    /// Retire everything immediately. Called on room disposal so pending
    /// items do not outlive the room.
    pub fn drain(&mut self) {
        let remaining = std::mem::take(&mut self.active);
        self.archive.extend(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(enabled: bool) -> NewsFactory {
        NewsFactory::new(enabled, GameRng::new(42))
    }

    #[test]
    fn test_fires_within_window() {
        let mut f = factory(true);
        let mut fired_at = None;
        for sec in 0..=MAX_DELAY_SECS {
            if f.on_clock_tick(sec).published.is_some() {
                fired_at = Some(sec);
                break;
            }
        }
        let at = fired_at.expect("bulletin within the window");
        assert!((MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&at));
    }

    #[test]
    fn test_disabled_factory_never_fires() {
        let mut f = factory(false);
        for sec in 0..500 {
            assert!(f.on_clock_tick(sec).published.is_none());
        }
    }

    #[test]
    fn test_items_age_and_archive() {
        let mut f = factory(false);
        f.inject("t".into(), "d".into(), 3, NewsEffect::None);
        assert_eq!(f.active().len(), 1);

        f.on_clock_tick(1);
        f.on_clock_tick(2);
        assert_eq!(f.active().len(), 1);
        f.on_clock_tick(3);
        assert!(f.active().is_empty());
        assert_eq!(f.archive().len(), 1);
    }

    #[test]
    fn test_zero_duration_item_archives_immediately() {
        let mut f = factory(false);
        let item = f.inject("flash".into(), "d".into(), 0, NewsEffect::None);
        assert!(item.exhausted());
        assert!(f.active().is_empty());
        assert_eq!(f.archive().len(), 1);
    }

    #[test]
    fn test_deterministic_schedule() {
        let mut a = factory(true);
        let mut b = factory(true);
        for sec in 0..200 {
            let fa = a.on_clock_tick(sec).published.map(|i| i.title);
            let fb = b.on_clock_tick(sec).published.map(|i| i.title);
            assert_eq!(fa, fb);
        }
    }

    #[test]
    fn test_drain_archives_active() {
        let mut f = factory(false);
        f.inject("t".into(), "d".into(), 10, NewsEffect::None);
        f.drain();
        assert!(f.active().is_empty());
        assert_eq!(f.archive().len(), 1);
    }
}
