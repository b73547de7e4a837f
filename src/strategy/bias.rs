//! Bias classification per timeframe
//!
//! The trend and momentum timeframes each collapse to a three-way bias; the
//! entry timeframe produces gating booleans instead. Instruments with the
//! `Relaxed` rule profile use sign-only variants of each rule.

use serde::{Deserialize, Serialize};

use crate::indicators::TimeframeSnapshot;
use crate::instruments::RuleProfile;

/// Directional bias for a timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "BEARISH")]
    Bearish,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl Bias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Bullish => "BULLISH",
            Bias::Bearish => "BEARISH",
            Bias::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trend bias: MACD line sign plus the EMA-200 side of price.
///
/// A missing EMA leaves the EMA condition satisfied. Relaxed instruments use
/// the MACD-line sign alone.
pub fn trend_bias(snapshot: &TimeframeSnapshot, profile: RuleProfile) -> Bias {
    let (bullish, bearish) = match profile {
        RuleProfile::Relaxed => (snapshot.macd_line > 0.0, snapshot.macd_line < 0.0),
        RuleProfile::Standard => {
            let above_ema = snapshot.ema_200.map_or(true, |ema| snapshot.close > ema);
            let below_ema = snapshot.ema_200.map_or(true, |ema| snapshot.close < ema);
            (
                snapshot.macd_line > 0.0 && above_ema,
                snapshot.macd_line < 0.0 && below_ema,
            )
        }
    };

    if bullish {
        Bias::Bullish
    } else if bearish {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Momentum bias: histogram sign plus a rising/falling requirement against
/// the previous closed bar. Relaxed instruments use the sign alone.
pub fn momentum_bias(snapshot: &TimeframeSnapshot, profile: RuleProfile) -> Bias {
    let (bullish, bearish) = match profile {
        RuleProfile::Relaxed => (snapshot.histogram > 0.0, snapshot.histogram < 0.0),
        RuleProfile::Standard => (
            snapshot.histogram > 0.0 && snapshot.histogram > snapshot.prev_histogram,
            snapshot.histogram < 0.0 && snapshot.histogram < snapshot.prev_histogram,
        ),
    };

    if bullish {
        Bias::Bullish
    } else if bearish {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Entry-timeframe gating booleans
#[derive(Debug, Clone, Copy)]
pub struct EntryGates {
    pub above_ema: bool,
    pub below_ema: bool,
    pub rsi_bullish: bool,
    pub rsi_bearish: bool,
    pub macd_bullish: bool,
    pub macd_bearish: bool,
}

impl EntryGates {
    pub fn allows_buy(&self) -> bool {
        self.above_ema && self.rsi_bullish && self.macd_bullish
    }

    pub fn allows_sell(&self) -> bool {
        self.below_ema && self.rsi_bearish && self.macd_bearish
    }
}

/// Entry-timeframe filters: EMA-200 side, RSI midline, and both MACD lines
/// on the same side of zero (line sign only when relaxed).
pub fn entry_gates(snapshot: &TimeframeSnapshot, profile: RuleProfile) -> EntryGates {
    let above_ema = snapshot.ema_200.map_or(true, |ema| snapshot.close > ema);
    let below_ema = snapshot.ema_200.map_or(true, |ema| snapshot.close < ema);

    let (rsi_bullish, rsi_bearish) = match profile {
        // Relaxed midline lets momentum majors signal a touch earlier
        RuleProfile::Relaxed => (
            snapshot.rsi.map_or(true, |rsi| rsi > 45.0),
            snapshot.rsi.map_or(true, |rsi| rsi < 55.0),
        ),
        RuleProfile::Standard => (
            snapshot.rsi.map_or(true, |rsi| rsi > 50.0),
            snapshot.rsi.map_or(true, |rsi| rsi < 50.0),
        ),
    };

    let (macd_bullish, macd_bearish) = match profile {
        RuleProfile::Relaxed => (snapshot.macd_line > 0.0, snapshot.macd_line < 0.0),
        RuleProfile::Standard => (
            snapshot.macd_line > 0.0 && snapshot.signal_line > 0.0,
            snapshot.macd_line < 0.0 && snapshot.signal_line < 0.0,
        ),
    };

    EntryGates {
        above_ema,
        below_ema,
        rsi_bullish,
        rsi_bearish,
        macd_bullish,
        macd_bearish,
    }
}
