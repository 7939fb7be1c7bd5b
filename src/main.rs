use anyhow::Context;
use tracing_subscriber::EnvFilter;

use index_investment_returns::{
    load_price_series, print_report, write_history_chart, Cli, Config, Report,
};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let config: Config = Cli::parse_args(std::env::args_os()).into();

    let series = load_price_series(&config.index_file, config.year_range).with_context(|| {
        format!(
            "failed to load index data from {}",
            config.index_file.display()
        )
    })?;

    let report = Report::build(&series, config.investment_amount())
        .context("failed to compute investment returns")?;
    print_report(&report, config.show_worth())?;

    if config.draw_history {
        write_history_chart(&series, &config.chart_file)
            .context("failed to draw price history")?;
        println!(
            "The price history chart was written to file {}",
            config.chart_file.display()
        );
    }

    Ok(())
}
