use crate::{AnalysisError, Result};

pub const MONTHS_PER_YEAR: usize = 12;

/// A fixed contribution made every `frequency` periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentPlan {
    pub amount: f64,
    pub frequency: usize,
}

impl InvestmentPlan {
    pub fn new(amount: f64, frequency: usize) -> Self {
        Self { amount, frequency }
    }

    pub fn monthly(amount: f64) -> Self {
        Self::new(amount, 1)
    }

    /// One contribution of `amount` every twelve months.
    pub fn yearly(amount: f64) -> Self {
        Self::new(amount, MONTHS_PER_YEAR)
    }

    /// Number of purchases made over a series of `periods` observations.
    pub fn contributions(&self, periods: usize) -> usize {
        if self.frequency == 0 {
            return 0;
        }
        periods.div_ceil(self.frequency)
    }

    fn validate(&self) -> Result<()> {
        if self.frequency == 0 {
            return Err(AnalysisError::InvalidPlan(
                "contribution frequency must be at least 1".to_string(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0. {
            return Err(AnalysisError::InvalidPlan(format!(
                "contribution amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnResult {
    /// Final worth over total invested; 1.0 is break-even.
    pub multiple: f64,
    pub total_invested: f64,
    pub contributions: usize,
}

impl ReturnResult {
    pub fn total_worth(&self) -> f64 {
        self.multiple * self.total_invested
    }
}

/// Simulates buying `plan.amount` worth of fractional shares at every
/// `plan.frequency`-th price and valuing the holding at the last price of
/// the series.
pub fn calc_return(prices: &[f64], plan: &InvestmentPlan) -> Result<ReturnResult> {
    plan.validate()?;
    let final_price = *prices
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("price series is empty".to_string()))?;

    let mut shares = 0.;
    for (index, &price) in prices.iter().enumerate().step_by(plan.frequency) {
        if price == 0. {
            return Err(AnalysisError::DivisionByZero { index });
        }
        shares += plan.amount / price;
    }
    let contributions = plan.contributions(prices.len());

    let final_worth = shares * final_price;
    let total_invested = plan.amount * contributions as f64;
    tracing::debug!(
        frequency = plan.frequency,
        contributions,
        shares,
        final_worth,
        "simulated periodic investment"
    );

    Ok(ReturnResult {
        multiple: final_worth / total_invested,
        total_invested,
        contributions,
    })
}
