use std::io::{self, Write};

use crate::{
    calc_return, solve_annual_rate_with, AnalysisError, ContributionSchedule, InvestmentPlan,
    PriceSeries, Result, ReturnResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyReport {
    pub plan: InvestmentPlan,
    pub result: ReturnResult,
    /// `None` when no equivalent rate could be solved for.
    pub annual_rate: Option<f64>,
}

impl StrategyReport {
    fn compute(highs: &[f64], plan: InvestmentPlan) -> Result<Self> {
        let result = calc_return(highs, &plan)?;
        let schedule = ContributionSchedule::for_plan(&plan, highs.len());
        let annual_rate = match solve_annual_rate_with(result.multiple, &schedule) {
            Ok(rate) => Some(rate),
            Err(e @ AnalysisError::ConvergenceError { .. }) => {
                tracing::warn!(frequency = plan.frequency, "{e}");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            plan,
            result,
            annual_rate,
        })
    }
}

/// Monthly dollar-cost averaging against one yearly contribution of the
/// same yearly total.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub first_date: String,
    pub last_date: String,
    pub months: usize,
    pub monthly: StrategyReport,
    pub yearly: StrategyReport,
}

impl Report {
    pub fn build(series: &PriceSeries, monthly_amount: f64) -> Result<Self> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(AnalysisError::InsufficientData(
                "no price data in the selected years".to_string(),
            ));
        };
        let highs = series.highs();
        Ok(Self {
            first_date: first.label.clone(),
            last_date: last.label.clone(),
            months: series.len(),
            monthly: StrategyReport::compute(&highs, InvestmentPlan::monthly(monthly_amount))?,
            yearly: StrategyReport::compute(
                &highs,
                InvestmentPlan::yearly(monthly_amount * 12.),
            )?,
        })
    }
}

pub fn write_report<W: Write>(out: &mut W, report: &Report, show_worth: bool) -> io::Result<()> {
    writeln!(
        out,
        "Invested from {} until {} ({} months)",
        report.first_date, report.last_date, report.months
    )?;
    write_strategy(out, "monthly investment", &report.monthly, show_worth)?;
    write_strategy(out, "single yearly investment", &report.yearly, show_worth)
}

fn write_strategy<W: Write>(
    out: &mut W,
    name: &str,
    strategy: &StrategyReport,
    show_worth: bool,
) -> io::Result<()> {
    let multiple = strategy.result.multiple;
    writeln!(
        out,
        "\nReturn with {}: {:.4} ({:+.2}%)",
        name,
        multiple,
        (multiple - 1.) * 100.
    )?;
    match strategy.annual_rate {
        Some(rate) => writeln!(out, "Equivalent annual rate: {:.2}%", rate * 100.)?,
        None => writeln!(out, "Equivalent annual rate: n/a")?,
    }
    if show_worth {
        writeln!(
            out,
            "Total invested: ${:.2}. Total worth: ${:.2}",
            strategy.result.total_invested,
            strategy.result.total_worth()
        )?;
    }
    Ok(())
}

pub fn print_report(report: &Report, show_worth: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, report, show_worth).map_err(|source| AnalysisError::Io {
        path: "<stdout>".into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PricePoint, YearMonth};
    use approx::assert_relative_eq;
    use time::Month;

    fn series(highs: &[f64]) -> PriceSeries {
        let points = highs
            .iter()
            .enumerate()
            .map(|(i, &high)| {
                let year = 2000 + (i / 12) as i32;
                let month = Month::try_from((i % 12) as u8 + 1).unwrap();
                PricePoint {
                    label: format!("{year}-{:02}", month as u8),
                    period: YearMonth::new(year, month),
                    high,
                }
            })
            .collect();
        PriceSeries::from_points(points)
    }

    #[test]
    fn flat_market_reports_zero_rate() {
        let report = Report::build(&series(&[50.; 24]), 1000.).unwrap();
        assert_eq!(report.months, 24);
        assert_eq!(report.first_date, "2000-01");
        assert_eq!(report.last_date, "2001-12");
        assert_relative_eq!(report.monthly.result.multiple, 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.monthly.result.total_invested, 24_000.);
        assert_relative_eq!(report.yearly.result.total_invested, 24_000.);
        assert_relative_eq!(report.monthly.annual_rate.unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(report.yearly.annual_rate.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn growing_market_recovers_its_rate() {
        let monthly_growth = 1.1f64.powf(1. / 12.);
        let highs: Vec<f64> = (0..120).map(|i| 100. * monthly_growth.powi(i)).collect();
        let report = Report::build(&series(&highs), 500.).unwrap();
        assert_relative_eq!(report.monthly.annual_rate.unwrap(), 0.1, epsilon = 1e-6);
        assert_relative_eq!(report.yearly.annual_rate.unwrap(), 0.1, epsilon = 1e-6);
        assert!(report.monthly.result.multiple > 1.);
    }

    #[test]
    fn both_plans_agree_when_series_ends_mid_year() {
        // 125 months: the last yearly purchase is held four more months.
        let monthly_growth = 0.95f64.powf(1. / 12.);
        let highs: Vec<f64> = (0..125).map(|i| 80. * monthly_growth.powi(i)).collect();
        let report = Report::build(&series(&highs), 1000.).unwrap();
        assert_eq!(report.yearly.result.contributions, 11);
        assert_relative_eq!(report.monthly.annual_rate.unwrap(), -0.05, epsilon = 1e-6);
        assert_relative_eq!(report.yearly.annual_rate.unwrap(), -0.05, epsilon = 1e-6);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = Report::build(&PriceSeries::default(), 1000.).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn writes_worth_only_when_requested() {
        let report = Report::build(&series(&[100., 50.]), 1000.).unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &report, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Invested from 2000-01 until 2000-02 (2 months)"));
        assert!(text.contains("Return with monthly investment: 0.7500 (-25.00%)"));
        assert!(text.contains("Return with single yearly investment: 0.5000 (-50.00%)"));
        assert!(!text.contains("Total worth"));

        let mut out = Vec::new();
        write_report(&mut out, &report, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total invested: $2000.00. Total worth: $1500.00"));
        assert!(text.contains("Total invested: $12000.00. Total worth: $6000.00"));
    }
}
