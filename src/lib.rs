use std::fmt;

use time::{format_description::BorrowedFormatItem, macros::format_description, Date, Month};

pub mod chart;
pub mod config;
mod error;
pub mod loader;
pub mod rate;
pub mod report;
pub mod returns;

pub use chart::{render_history_svg, write_history_chart};
pub use config::{Cli, Config};
pub use error::AnalysisError;
pub use loader::{load_price_series, read_price_series};
pub use rate::{annuity_multiple, solve_annual_rate, solve_annual_rate_with, ContributionSchedule};
pub use report::{print_report, Report};
pub use returns::{calc_return, InvestmentPlan, ReturnResult};

pub type Result<T> = std::result::Result<T, AnalysisError>;

static YEAR_MONTH_FMT: &[BorrowedFormatItem] = format_description!("[year]-[month]");

/// Calendar month a price observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: Month,
}

impl YearMonth {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    pub fn first_day(&self) -> Option<Date> {
        Date::from_calendar_date(self.year, self.month, 1).ok()
    }
}

impl From<Date> for YearMonth {
    fn from(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .first_day()
            .and_then(|d| d.format(YEAR_MONTH_FMT).ok());
        match formatted {
            Some(s) => f.write_str(&s),
            None => write!(f, "{}-{:02}", self.year, self.month as u8),
        }
    }
}

/// Inclusive year filter; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    /// The `Date` cell as it appeared in the file.
    pub label: String,
    pub period: YearMonth,
    pub high: f64,
}

/// Chronological price observations, at most one per calendar month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, dropping any point whose month equals the month of
    /// the previously kept point.
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        let mut kept: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            if kept.last().is_some_and(|prev| prev.period == point.period) {
                tracing::debug!(date = %point.label, "dropping repeated month");
                continue;
            }
            kept.push(point);
        }
        Self { points: kept }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn highs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.high).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
