//! Price generation: intrinsic value and guide price.
//!
//! The model keeps two prices per room. The *intrinsic value* is the slowly
//! drifting fundamental; informed strategies trade on it. The *guide price*
//! is the noisy random walk the market actually tracks: geometric Brownian
//! motion with a mean-reversion pull toward intrinsic and transient additive
//! shocks. Separating the two lets the guide diverge short-term while the
//! reversion term keeps it anchored.
//!
//! Internal state is `f64`; everything emitted is ceiling-rounded to the
//! two-decimal grid.

use pit_core::{GameRng, Price};

/// Hard floor for both prices.
const MIN_PRICE: f64 = 0.01;

/// Bounded guide-price history length.
const HISTORY_CAP: usize = 20;

/// Default shock length in ticks.
const DEFAULT_SHOCK_TICKS: u32 = 10;

/// A transient additive drift term.
#[derive(Debug, Clone, Copy)]
pub struct Shock {
    pub intensity: f64,
    pub ticks_remaining: u32,
}

#[derive(Debug)]
pub struct PriceGenerator {
    intrinsic_value: f64,
    guide_price: f64,
    drift: f64,
    volatility: f64,
    mean_reversion: f64,
    shock: Option<Shock>,
    history: Vec<Price>,
    rng: GameRng,
}

impl PriceGenerator {
    pub fn new(opening_price: Price, volatility: f64, rng: GameRng) -> Self {
        let opening = opening_price.as_f64().max(MIN_PRICE);
        Self {
            intrinsic_value: opening,
            guide_price: opening,
            drift: 0.0,
            volatility: volatility.clamp(f64::MIN_POSITIVE, 1.0),
            mean_reversion: 0.1,
            shock: None,
            history: Vec::with_capacity(HISTORY_CAP),
            rng,
        }
    }

    pub fn with_mean_reversion(mut self, strength: f64) -> Self {
        self.mean_reversion = strength.clamp(0.0, 1.0);
        self
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn intrinsic_value(&self) -> Price {
        Price::from_f64_ceil(self.intrinsic_value)
    }

    pub fn guide_price(&self) -> Price {
        Price::from_f64_ceil(self.guide_price)
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Replace the volatility, clamped to `(0, 1]`. Used by market powers;
    /// the caller is responsible for restoring the previous value.
    pub fn set_volatility(&mut self, volatility: f64) {
        self.volatility = volatility.clamp(f64::MIN_POSITIVE, 1.0);
    }

    /// Most recent guide prices, oldest first, at most 20 samples.
    pub fn history(&self) -> &[Price] {
        &self.history
    }

    pub fn active_shock(&self) -> Option<Shock> {
        self.shock
    }

    /// Advance the model one tick and return `(intrinsic, guide)`.
    pub fn tick(&mut self) -> (Price, Price) {
        let shock_contribution = match self.shock.as_mut() {
            Some(shock) => {
                let intensity = shock.intensity;
                shock.ticks_remaining -= 1;
                if shock.ticks_remaining == 0 {
                    self.shock = None;
                }
                intensity
            }
            None => 0.0,
        };

        let reversion =
            -((self.guide_price - self.intrinsic_value) / self.intrinsic_value)
                * self.mean_reversion;
        let total_drift = self.drift + shock_contribution + reversion;

        let z = self.rng.normal();
        let vol = self.volatility;
        self.guide_price *= (total_drift - 0.5 * vol * vol + vol * z).exp();
        self.guide_price = self.guide_price.max(MIN_PRICE);

        let guide = self.guide_price();
        if self.history.len() == HISTORY_CAP {
            self.history.remove(0);
        }
        self.history.push(guide);

        (self.intrinsic_value(), guide)
    }

    /// Apply a transient shock to the guide price drift, replacing any
    /// shock already running. `intensity` is in drift units per tick.
    pub fn shock(&mut self, intensity: f64, duration_ticks: Option<u32>) {
        let ticks = duration_ticks.unwrap_or(DEFAULT_SHOCK_TICKS);
        if ticks == 0 {
            return;
        }
        self.shock = Some(Shock {
            intensity,
            ticks_remaining: ticks,
        });
    }

    /// Apply a shock of random sign and magnitude up to `max_intensity`.
    pub fn random_shock(&mut self, max_intensity: f64) {
        let intensity = self.rng.bipolar() * max_intensity;
        self.shock(intensity, None);
    }

    /// Reprice the fundamental by `pct` (e.g. `0.05` for +5%).
    pub fn intrinsic_shock(&mut self, pct: f64) {
        self.intrinsic_value = (self.intrinsic_value * (1.0 + pct)).max(MIN_PRICE);
    }

    /// Drift the fundamental by `pct` with a random sign.
    pub fn drift_intrinsic(&mut self, pct: f64) {
        let signed = if self.rng.chance(0.5) { pct } else { -pct };
        self.intrinsic_shock(signed);
    }
}
