use chrono::NaiveDate;

/// Injected predicate for "is this date a business day". Kept strictly
/// abstract per SPEC_FULL.md §9: holiday tables, if ever needed, are the
/// caller's concern, not the ledger's.
pub trait BusinessDayPredicate: Send + Sync {
    fn is_business_day(&self, date: NaiveDate) -> bool;
}

/// Default predicate: Saturday and Sunday are not business days, every
/// other day is. No holiday table.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayOnly;

impl BusinessDayPredicate for WeekdayOnly {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        use chrono::Weekday;
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl<F> BusinessDayPredicate for F
where
    F: Fn(NaiveDate) -> bool + Send + Sync,
{
    fn is_business_day(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_only_excludes_weekends() {
        let pred = WeekdayOnly;
        // 2026-01-23 is a Friday, 2026-01-24 a Saturday, 2026-01-25 a Sunday.
        assert!(pred.is_business_day(NaiveDate::from_ymd_opt(2026, 1, 23).unwrap()));
        assert!(!pred.is_business_day(NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()));
        assert!(!pred.is_business_day(NaiveDate::from_ymd_opt(2026, 1, 25).unwrap()));
        assert!(pred.is_business_day(NaiveDate::from_ymd_opt(2026, 1, 26).unwrap()));
    }

    #[test]
    fn closure_predicate_composes() {
        use chrono::Datelike;
        let pred = |d: NaiveDate| d.day() != 25;
        assert!(!pred.is_business_day(NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()));
    }
}
