//! Room game settings.

use crate::money::{Cash, Price};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings-related failures surfaced to the admin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("settings can only be changed while the game is paused")]
    GameRunning,
}

/// Per-room game configuration.
///
/// `market_volatility` is stored as the per-tick fraction the price model
/// consumes; the wire carries it as a percentage, both in
/// [`SettingsPatch`] updates and when these settings are serialized back
/// out in room state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub starting_cash: Cash,
    pub opening_price: Price,
    pub seed: u64,
    #[serde(with = "volatility_percent")]
    pub market_volatility: f64,
    /// Game length in minutes.
    pub game_duration: u64,
    pub enable_random_news: bool,
    pub bots: u32,
    #[serde(rename = "ticketName")]
    pub ticker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_selection: Option<Vec<String>>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            starting_cash: Cash::from_int(10_000),
            opening_price: Price::from_int(1),
            seed: 42,
            market_volatility: 0.05,
            game_duration: 5,
            enable_random_news: true,
            bots: 0,
            ticker_name: "AAPL".to_string(),
            bot_selection: None,
        }
    }
}

/// Partial settings update, as sent by the room admin.
///
/// Absent fields leave the current value untouched; a present `seed` of 0 is
/// applied verbatim, it does not fall back to the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub starting_cash: Option<f64>,
    pub opening_price: Option<f64>,
    pub seed: Option<u64>,
    /// Percentage, e.g. `5` for 5%.
    pub market_volatility: Option<f64>,
    pub game_duration: Option<u64>,
    pub enable_random_news: Option<bool>,
    pub bots: Option<i64>,
    #[serde(rename = "ticketName")]
    pub ticker_name: Option<String>,
    pub bot_selection: Option<Vec<String>>,
}

/// Serde bridge between the stored fraction and the wire percentage.
mod volatility_percent {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value * 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(f64::deserialize(deserializer)? / 100.0)
    }
}

impl GameSettings {
    pub fn duration_secs(&self) -> u64 {
        self.game_duration * 60
    }

    /// Merge a partial update, clamping every value into its documented range.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(cash) = patch.starting_cash {
            let clamped = cash.clamp(0.0, 999_999_999.0);
            self.starting_cash = Cash::from_cents((clamped * 100.0).round() as i64);
        }
        if let Some(price) = patch.opening_price {
            self.opening_price = Price::from_f64_ceil(price.clamp(0.01, 10_000.0));
        }
        if let Some(seed) = patch.seed {
            self.seed = seed;
        }
        if let Some(vol_pct) = patch.market_volatility {
            self.market_volatility = vol_pct.clamp(0.001, 1.0) / 100.0;
        }
        if let Some(duration) = patch.game_duration {
            self.game_duration = duration.clamp(1, 60);
        }
        if let Some(news) = patch.enable_random_news {
            self.enable_random_news = news;
        }
        if let Some(bots) = patch.bots {
            self.bots = bots.clamp(0, 50) as u32;
        }
        if let Some(ticker) = patch.ticker_name {
            self.ticker_name = ticker;
        }
        if let Some(selection) = patch.bot_selection {
            self.bot_selection = Some(selection);
        }
    }
}
