//! Converts a periodic-contribution return multiple into the constant
//! monthly-compounding annual rate that would have produced it.
//!
//! With `n` equal contributions made every `s` months, monthly growth
//! `g = (1 + r)^(1/12)` and the holding valued `h` months after the first
//! purchase, the multiple is
//!
//! ```text
//! g^(h - (n - 1) s) * (g^(n s) - 1) / n / (g^s - 1)
//! ```
//!
//! For monthly contributions valued at the last purchase (`s = 1`,
//! `h = n - 1`) this is `((1 + r)^(n/12) - 1) / n / ((1 + r)^(1/12) - 1)`,
//! the future value of an ordinary annuity of `n` unit payments normalised
//! by `n`.

use crate::returns::MONTHS_PER_YEAR;
use crate::{AnalysisError, InvestmentPlan, Result};

const INITIAL_GUESS: f64 = 0.07;
const TOLERANCE: f64 = 1e-10;
const MAX_NEWTON_ITERATIONS: usize = 100;
const MAX_BISECTION_ITERATIONS: usize = 200;
const UPPER_BOUND_LIMIT: f64 = 1e6;

/// When and how often money went in, and when the holding was valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionSchedule {
    pub contributions: usize,
    pub spacing_months: usize,
    /// Months from the first purchase to the valuation.
    pub horizon_months: usize,
}

impl ContributionSchedule {
    /// One contribution a month, valued at the last purchase.
    pub fn monthly(months: usize) -> Self {
        Self {
            contributions: months,
            spacing_months: 1,
            horizon_months: months.saturating_sub(1),
        }
    }

    /// The schedule `calc_return` simulates for `plan` over `periods`
    /// monthly prices: valued at the last price of the series.
    pub fn for_plan(plan: &InvestmentPlan, periods: usize) -> Self {
        Self {
            contributions: plan.contributions(periods),
            spacing_months: plan.frequency,
            horizon_months: periods.saturating_sub(1),
        }
    }

    /// Months the last contribution is held before valuation.
    fn trailing_months(&self) -> usize {
        self.horizon_months
            .saturating_sub(self.contributions.saturating_sub(1) * self.spacing_months)
    }

    fn validate(&self) -> Result<()> {
        if self.contributions == 0 {
            return Err(AnalysisError::InsufficientData(
                "cannot solve a rate over zero periods".to_string(),
            ));
        }
        if self.spacing_months == 0 {
            return Err(AnalysisError::InvalidPlan(
                "contribution spacing must be at least one month".to_string(),
            ));
        }
        if self.horizon_months < (self.contributions - 1) * self.spacing_months {
            return Err(AnalysisError::InvalidPlan(format!(
                "valuation after {} months precedes the last of {} contributions",
                self.horizon_months, self.contributions
            )));
        }
        Ok(())
    }
}

fn monthly_log_growth(rate: f64) -> f64 {
    rate.ln_1p() / MONTHS_PER_YEAR as f64
}

/// `(e^(n y) - 1) / (n (e^y - 1))` and its derivative in `y`.
fn annuity_factor(y: f64, n: f64) -> (f64, f64) {
    if y.abs() < 1e-12 {
        return (1. + (n - 1.) * y / 2., (n - 1.) / 2.);
    }
    let em1 = y.exp_m1();
    let value = (n * y).exp_m1() / (n * em1);
    let slope = if y.abs() < 1e-6 {
        (n - 1.) / 2.
    } else {
        (n * (n * y).exp() * em1 - (n * y).exp_m1() * y.exp()) / (n * em1 * em1)
    };
    (value, slope)
}

/// Forward equation: the return multiple an annual `rate` yields under
/// `schedule`.
///
/// Evaluated through `ln_1p`/`exp_m1`, so it stays accurate around
/// `rate = 0`, where the multiple tends to 1.
pub fn annuity_multiple(rate: f64, schedule: &ContributionSchedule) -> f64 {
    multiple_and_slope(rate, schedule).0
}

/// Multiple and d(multiple)/d(rate).
fn multiple_and_slope(rate: f64, schedule: &ContributionSchedule) -> (f64, f64) {
    let n = schedule.contributions as f64;
    let s = schedule.spacing_months as f64;
    let trailing = schedule.trailing_months() as f64;
    let x = monthly_log_growth(rate);
    let (factor, factor_slope) = annuity_factor(s * x, n);
    let carry = (trailing * x).exp();
    let dm_dx = carry * (trailing * factor + s * factor_slope);
    let dx_drate = 1. / (MONTHS_PER_YEAR as f64 * (1. + rate));
    (carry * factor, dm_dx * dx_drate)
}

/// Solves for the monthly-compounding annual rate behind `multiple`
/// achieved with one contribution per month over `months` months.
pub fn solve_annual_rate(multiple: f64, months: usize) -> Result<f64> {
    solve_annual_rate_with(multiple, &ContributionSchedule::monthly(months))
}

/// Newton's method from 7%, falling back to bisection when Newton fails
/// to settle.
pub fn solve_annual_rate_with(multiple: f64, schedule: &ContributionSchedule) -> Result<f64> {
    schedule.validate()?;
    let convergence_error = || AnalysisError::ConvergenceError {
        multiple,
        periods: schedule.contributions,
    };
    if !multiple.is_finite() {
        return Err(convergence_error());
    }
    if (multiple - 1.).abs() <= TOLERANCE {
        return Ok(0.);
    }

    let residual = |rate: f64| annuity_multiple(rate, schedule) - multiple;

    if let Some(rate) = newton(&residual, |rate| multiple_and_slope(rate, schedule).1) {
        return Ok(rate);
    }
    tracing::debug!(
        multiple,
        contributions = schedule.contributions,
        "newton did not converge, falling back to bisection"
    );
    bisection(&residual).ok_or_else(convergence_error)
}

fn newton(residual: &impl Fn(f64) -> f64, derivative: impl Fn(f64) -> f64) -> Option<f64> {
    let mut rate = INITIAL_GUESS;
    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let slope = derivative(rate);
        if !slope.is_finite() || slope == 0. {
            return None;
        }
        let step = residual(rate) / slope;
        let next = rate - step;
        tracing::trace!(iteration, rate, step, "newton step");
        if !next.is_finite() || next <= -1. {
            return None;
        }
        if step.abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

/// Walks the lower bound toward -1, halving its distance each time, until
/// the residual is negative there.
fn lower_bracket(residual: &impl Fn(f64) -> f64) -> Option<f64> {
    let mut lo = -0.5;
    loop {
        let at_lo = residual(lo);
        if at_lo.is_nan() {
            return None;
        }
        if at_lo <= 0. {
            return Some(lo);
        }
        let next = -1. + (lo + 1.) / 2.;
        if next <= -1. || next == lo {
            return None;
        }
        lo = next;
    }
}

/// The residual is increasing in the rate, so a root is bracketed by a
/// non-positive value below it and a non-negative one above it.
fn bisection(residual: &impl Fn(f64) -> f64) -> Option<f64> {
    let mut lo = lower_bracket(residual)?;
    let mut hi = 1.;
    while residual(hi) < 0. {
        hi *= 2.;
        if hi > UPPER_BOUND_LIMIT {
            return None;
        }
    }
    if residual(hi).is_nan() {
        return None;
    }
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / 2.;
        if residual(mid) < 0. {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < TOLERANCE {
            return Some((lo + hi) / 2.);
        }
    }
    None
}
