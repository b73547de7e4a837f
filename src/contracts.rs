//! Futures contract rollover
//!
//! Monthly index futures expire on the last Thursday of their month; the
//! tradable contract rolls to the next month one day before expiry. The
//! contract label, expiry date and days-to-expiry are recomputed every cycle
//! and travel as metadata beside the signal; they are never engine state.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Contract metadata published with each cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// e.g. "JAN 26"
    pub contract: String,
    /// e.g. "29-Jan-2026"
    pub expiry: String,
    pub days_to_expiry: i64,
}

/// Last Thursday of the given month
pub fn last_thursday(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let mut day = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid first of month")
        - Duration::days(1);
    while day.weekday() != Weekday::Thu {
        day -= Duration::days(1);
    }
    day
}

/// Resolve the active contract month for `today`.
///
/// The roll happens one day before expiry: on and after (expiry - 1 day)
/// the next month's contract is the tradable one.
pub fn active_contract(today: NaiveDate) -> ContractInfo {
    let mut year = today.year();
    let mut month = today.month();
    let mut expiry = last_thursday(year, month);

    if today >= expiry - Duration::days(1) {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
        expiry = last_thursday(year, month);
    }

    ContractInfo {
        contract: format!("{} {:02}", month_abbrev(month), year % 100),
        expiry: format!("{:02}-{}-{}", expiry.day(), month_title(expiry.month()), expiry.year()),
        days_to_expiry: (expiry - today).num_days(),
    }
}

/// Effective tradable symbol for a futures base, e.g. "NIFTY-JAN26-FUT"
pub fn effective_symbol(base: &str, info: &ContractInfo) -> String {
    let compact = info.contract.replace(' ', "");
    format!("{}-{}-FUT", base, compact)
}

fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "JAN",
        2 => "FEB",
        3 => "MAR",
        4 => "APR",
        5 => "MAY",
        6 => "JUN",
        7 => "JUL",
        8 => "AUG",
        9 => "SEP",
        10 => "OCT",
        11 => "NOV",
        _ => "DEC",
    }
}

fn month_title(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_thursday() {
        // January 2026: Thursdays fall on 1, 8, 15, 22, 29
        assert_eq!(
            last_thursday(2026, 1),
            NaiveDate::from_ymd_opt(2026, 1, 29).unwrap()
        );
        // December 2026 crosses a year boundary in the lookup
        assert_eq!(
            last_thursday(2026, 12),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_contract_mid_month() {
        let info = active_contract(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(info.contract, "JAN 26");
        assert_eq!(info.expiry, "29-Jan-2026");
        assert_eq!(info.days_to_expiry, 24);
    }

    #[test]
    fn test_roll_one_day_before_expiry() {
        // Expiry 29-Jan; the 27th still trades JAN
        let before = active_contract(NaiveDate::from_ymd_opt(2026, 1, 27).unwrap());
        assert_eq!(before.contract, "JAN 26");

        // The 28th (expiry - 1) already trades FEB
        let roll_day = active_contract(NaiveDate::from_ymd_opt(2026, 1, 28).unwrap());
        assert_eq!(roll_day.contract, "FEB 26");
        assert_eq!(roll_day.expiry, "26-Feb-2026");
    }

    #[test]
    fn test_december_rolls_into_january() {
        // Dec 2026 expiry is the 31st; the 30th rolls into JAN 27
        let info = active_contract(NaiveDate::from_ymd_opt(2026, 12, 30).unwrap());
        assert_eq!(info.contract, "JAN 27");
    }

    #[test]
    fn test_effective_symbol() {
        let info = active_contract(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(effective_symbol("NIFTY", &info), "NIFTY-JAN26-FUT");
    }
}
