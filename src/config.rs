use std::{ffi::OsString, path::PathBuf};

use clap::Parser;

use crate::YearRange;

/// Contribution used for the multiples when no monthly amount is given.
pub const DEFAULT_MONTHLY_INVESTMENT: f64 = 1000.;

const YEAR_SHORT_FLAGS: [(&str, &str); 2] = [("-y0", "--start_year"), ("-y1", "--end_year")];

#[derive(Debug, Parser)]
#[command(name = "index-returns")]
#[command(about = "Process monthly historical data from an index", long_about = None)]
#[command(version)]
pub struct Cli {
    /// File where the desired index data resides (csv)
    #[arg(short = 'f', long = "index_file", default_value = "index.csv")]
    pub index_file: PathBuf,

    /// Draw the price history as an SVG chart
    #[arg(short = 'd', long = "draw_history")]
    pub draw_history: bool,

    /// Monthly amount invested; also prints the total worth
    #[arg(short = 'm', long = "monthly_investment")]
    pub monthly_investment: Option<f64>,

    /// First year to include
    #[arg(long = "start_year", visible_alias = "y0")]
    pub start_year: Option<i32>,

    /// Last year to include
    #[arg(long = "end_year", visible_alias = "y1")]
    pub end_year: Option<i32>,

    /// Where the price history chart is written
    #[arg(long = "chart_file", default_value = "index_history.svg")]
    pub chart_file: PathBuf,
}

impl Cli {
    /// Parses `args`, accepting the two-character `-y0`/`-y1` year flags.
    pub fn parse_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(expand_year_flags(args))
    }
}

/// Rewrites `-y0`/`-y1` (and `-y0=1990`) into their long forms, which clap
/// cannot declare as shorts.
pub fn expand_year_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| expand_year_flag(arg.into()))
        .collect()
}

fn expand_year_flag(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    for (short, long) in YEAR_SHORT_FLAGS {
        if let Some(rest) = text.strip_prefix(short) {
            if rest.is_empty() || rest.starts_with('=') {
                return format!("{long}{rest}").into();
            }
        }
    }
    arg
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub index_file: PathBuf,
    pub draw_history: bool,
    pub monthly_investment: Option<f64>,
    pub year_range: YearRange,
    pub chart_file: PathBuf,
}

impl Config {
    pub fn investment_amount(&self) -> f64 {
        self.monthly_investment
            .unwrap_or(DEFAULT_MONTHLY_INVESTMENT)
    }

    pub fn show_worth(&self) -> bool {
        self.monthly_investment.is_some()
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            index_file: cli.index_file,
            draw_history: cli.draw_history,
            monthly_investment: cli.monthly_investment,
            year_range: YearRange::new(cli.start_year, cli.end_year),
            chart_file: cli.chart_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Cli::try_parse_from(std::iter::once("index-returns").chain(args.iter().copied()))
            .unwrap()
            .into()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.index_file, PathBuf::from("index.csv"));
        assert!(!config.draw_history);
        assert_eq!(config.year_range, YearRange::default());
        assert!(!config.show_worth());
        assert_eq!(config.investment_amount(), DEFAULT_MONTHLY_INVESTMENT);
    }

    #[test]
    fn long_and_short_flags() {
        let config = parse(&[
            "-f",
            "sp500.csv",
            "-d",
            "-m",
            "250.5",
            "--y0",
            "1990",
            "--end_year",
            "2000",
        ]);
        assert_eq!(config.index_file, PathBuf::from("sp500.csv"));
        assert!(config.draw_history);
        assert_eq!(config.monthly_investment, Some(250.5));
        assert_eq!(config.year_range, YearRange::new(Some(1990), Some(2000)));
        assert!(config.show_worth());
    }

    #[test]
    fn two_character_year_flags() {
        let cli = Cli::try_parse_from(expand_year_flags([
            "index-returns",
            "-y0",
            "1990",
            "-y1=2000",
        ]))
        .unwrap();
        let config = Config::from(cli);
        assert_eq!(config.year_range, YearRange::new(Some(1990), Some(2000)));
    }

    #[test]
    fn other_arguments_pass_through() {
        let args = expand_year_flags(["index-returns", "-y01990", "--y0", "-d"]);
        assert_eq!(args, ["index-returns", "-y01990", "--y0", "-d"].map(OsString::from));
    }

    #[test]
    fn rejects_non_numeric_amount() {
        let parsed = Cli::try_parse_from(["index-returns", "-m", "lots"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
