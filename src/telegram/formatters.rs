//! HTML message formatting for Telegram alerts

use chrono::Utc;

use crate::positions::{Position, TradeMetrics};
use crate::reentry::ReentryOpportunity;
use crate::utils::format_price;

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// New BUY/SELL signal alert
pub fn new_signal_message(position: &Position, tick_size: f64) -> String {
    let emoji = match position.direction {
        crate::positions::Direction::Buy => "🟢",
        crate::positions::Direction::Sell => "🔴",
    };
    let sl_dist = position.stop_distance();
    let tp1_dist = (position.tp_levels[0] - position.entry_price).abs();
    let rr = if sl_dist > 0.0 { tp1_dist / sl_dist } else { 0.0 };

    format!(
        "{emoji} <b>NEW {dir} SIGNAL</b>\n\
         \n\
         <b>Instrument:</b> {name}\n\
         <b>Category:</b> {category}\n\
         \n\
         <b>Entry:</b> {entry}\n\
         <b>Stop Loss:</b> {sl}\n\
         \n\
         <b>Take Profits:</b>\n\
         \u{2022} TP1: {tp1}\n\
         \u{2022} TP2: {tp2}\n\
         \u{2022} TP3: {tp3}\n\
         \n\
         <b>Risk:Reward:</b> 1:{rr:.1}\n\
         <b>Time:</b> {time}\n\
         \n\
         💡 <i>Trade at your own risk. Always use proper risk management.</i>",
        emoji = emoji,
        dir = position.direction.as_str(),
        name = position.instrument,
        category = position.category.as_str(),
        entry = format_price(position.entry_price, tick_size),
        sl = format_price(position.original_sl, tick_size),
        tp1 = format_price(position.tp_levels[0], tick_size),
        tp2 = format_price(position.tp_levels[1], tick_size),
        tp3 = format_price(position.tp_levels[2], tick_size),
        rr = rr,
        time = timestamp(),
    )
}

/// Take-profit alert; `level` is 1-based
pub fn tp_hit_message(position: &Position, level: usize, price: f64, tick_size: f64) -> String {
    let profit = position.direction.sign() * (price - position.entry_price);
    let profit_pct = if position.entry_price > 0.0 {
        profit / position.entry_price * 100.0
    } else {
        0.0
    };
    let status = if level == 1 {
        "Trailing SL Active, stop moved to breakeven 🛡️".to_string()
    } else if level == 2 {
        "Stop moved to TP1 🛡️".to_string()
    } else {
        format!("TP{} reached, full exit 🚀", level)
    };

    format!(
        "🎯 <b>TP{level} HIT!</b>\n\
         \n\
         <b>Instrument:</b> {name}\n\
         <b>Type:</b> {dir}\n\
         \n\
         <b>Entry:</b> {entry}\n\
         <b>Price:</b> {price}\n\
         \n\
         <b>Profit:</b> {profit} ({pct:+.2}%)\n\
         <b>Status:</b> {status}\n\
         <b>Time:</b> {time}",
        level = level,
        name = position.instrument,
        dir = position.direction.as_str(),
        entry = format_price(position.entry_price, tick_size),
        price = format_price(price, tick_size),
        profit = format_price(profit.abs(), tick_size),
        pct = profit_pct,
        status = status,
        time = timestamp(),
    )
}

/// Stop-loss / trailing-stop alert with close metrics
pub fn sl_hit_message(
    position: &Position,
    price: f64,
    is_trailing: bool,
    metrics: &TradeMetrics,
    tick_size: f64,
) -> String {
    let label = if is_trailing { "TRAILING SL" } else { "STOP LOSS" };

    format!(
        "🛑 <b>{label} HIT</b>\n\
         \n\
         <b>Instrument:</b> {name}\n\
         <b>Type:</b> {dir}\n\
         \n\
         <b>Entry:</b> {entry}\n\
         <b>Exit:</b> {exit}\n\
         \n\
         <b>P/L:</b> {ticks:+.1} ticks ({pct:+.2}%)\n\
         <b>R:R achieved:</b> {rr:+.2}\n\
         <b>Time:</b> {time}\n\
         \n\
         💭 <i>Every loss is a lesson. Review and improve!</i>",
        label = label,
        name = position.instrument,
        dir = position.direction.as_str(),
        entry = format_price(position.entry_price, tick_size),
        exit = format_price(price, tick_size),
        ticks = metrics.pnl_ticks,
        pct = metrics.pnl_percent,
        rr = metrics.achieved_rr,
        time = timestamp(),
    )
}

/// Reversal-close alert with close metrics
pub fn reversal_close_message(
    position: &Position,
    price: f64,
    metrics: &TradeMetrics,
    tick_size: f64,
) -> String {
    format!(
        "🔄 <b>REVERSAL CLOSE</b>\n\
         \n\
         <b>Instrument:</b> {name}\n\
         <b>Type:</b> {dir}\n\
         \n\
         <b>Entry:</b> {entry}\n\
         <b>Exit:</b> {exit}\n\
         \n\
         <b>P/L:</b> {ticks:+.1} ticks ({pct:+.2}%)\n\
         <b>Reason:</b> opposite trend and momentum confirmed with a fresh cross\n\
         <b>Time:</b> {time}",
        name = position.instrument,
        dir = position.direction.as_str(),
        entry = format_price(position.entry_price, tick_size),
        exit = format_price(price, tick_size),
        ticks = metrics.pnl_ticks,
        pct = metrics.pnl_percent,
        time = timestamp(),
    )
}

/// Re-entry opportunity alert
pub fn reentry_message(instrument: &str, opportunity: &ReentryOpportunity) -> String {
    let strength_emoji = if opportunity.strength >= 70 {
        "🟢"
    } else if opportunity.strength >= 50 {
        "🟡"
    } else {
        "🟠"
    };

    format!(
        "🔄 <b>RE-ENTRY OPPORTUNITY</b>\n\
         \n\
         <b>Instrument:</b> {name}\n\
         <b>Strength:</b> {emoji} {strength}%\n\
         \n\
         <b>Suggested Entry:</b> {entry}\n\
         <b>Fibonacci Level:</b> {level}\n\
         <b>Rejection Zone:</b> {zone}\n\
         <b>Risk:Reward:</b> {rr}\n\
         \n\
         <b>Reason:</b> {reason}\n\
         <b>Confirmation:</b> {confirmation}\n\
         <b>Time:</b> {time}\n\
         \n\
         ⚠️ <i>Re-entry opportunity detected. Confirm with your analysis.</i>",
        name = instrument,
        emoji = strength_emoji,
        strength = opportunity.strength,
        entry = opportunity.suggested_entry,
        level = opportunity.fib_level,
        zone = opportunity.rejection_zone,
        rr = opportunity.risk_reward,
        reason = opportunity.reason,
        confirmation = opportunity.confirmation,
        time = timestamp(),
    )
}

/// Startup notice
pub fn startup_message(instrument_count: usize) -> String {
    format!(
        "✅ <b>BiasBuster online</b>\n\
         \n\
         Watching {count} instruments.\n\
         You will receive notifications for:\n\
         \u{2022} New BUY/SELL signals\n\
         \u{2022} TP1, TP2, TP3 hits\n\
         \u{2022} Stop-loss hits\n\
         \u{2022} Re-entry opportunities\n\
         \n\
         <b>Time:</b> {time}",
        count = instrument_count,
        time = timestamp(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Category;
    use crate::positions::{Direction, LifecycleStatus};
    use chrono::TimeZone;

    fn position() -> Position {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Position {
            instrument: "Gold".to_string(),
            direction: Direction::Buy,
            entry_price: 2650.0,
            original_sl: 2640.0,
            current_sl: 2640.0,
            tp_levels: [2665.0, 2680.0, 2700.0],
            tp_hits: [false, false, false],
            opened_at: opened,
            candle_time: opened,
            category: Category::MetalsEnergy,
            status: LifecycleStatus::New,
        }
    }

    #[test]
    fn test_new_signal_contains_ladder() {
        let message = new_signal_message(&position(), 0.1);
        assert!(message.contains("NEW BUY SIGNAL"));
        assert!(message.contains("Gold"));
        assert!(message.contains("2665.00"));
        assert!(message.contains("1:1.5"));
    }

    #[test]
    fn test_tp_message_levels() {
        let message = tp_hit_message(&position(), 1, 2666.0, 0.1);
        assert!(message.contains("TP1 HIT"));
        assert!(message.contains("breakeven"));

        let full_exit = tp_hit_message(&position(), 3, 2701.0, 0.1);
        assert!(full_exit.contains("full exit"));
    }

    #[test]
    fn test_sl_message_uses_metrics() {
        let metrics = TradeMetrics {
            pnl_ticks: -100.0,
            pnl_percent: -0.38,
            duration_secs: 3600,
            achieved_rr: -1.0,
        };
        let message = sl_hit_message(&position(), 2640.0, false, &metrics, 0.1);
        assert!(message.contains("STOP LOSS HIT"));
        assert!(message.contains("-100.0 ticks"));

        let trailing = sl_hit_message(&position(), 2650.0, true, &metrics, 0.1);
        assert!(trailing.contains("TRAILING SL HIT"));
    }
}
