use std::{fs::File, io, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::{AnalysisError, PricePoint, PriceSeries, Result, YearMonth, YearRange};

const DATE_HEADER: &str = "Date";
const HIGH_HEADER: &str = "High";

static CSV_DATE_FMT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

fn get_column_indices(headers: &StringRecord) -> Result<(usize, usize)> {
    let mut date_index: Option<usize> = None;
    let mut high_index: Option<usize> = None;
    headers
        .iter()
        .enumerate()
        .for_each(|(pos, h)| match h.trim() {
            DATE_HEADER if date_index.is_none() => date_index = Some(pos),
            HIGH_HEADER if high_index.is_none() => high_index = Some(pos),
            _ => {}
        });
    let missing = |name: &str| AnalysisError::MalformedRecord {
        line: 1,
        reason: format!("missing required column '{name}'"),
    };
    Ok((
        date_index.ok_or_else(|| missing(DATE_HEADER))?,
        high_index.ok_or_else(|| missing(HIGH_HEADER))?,
    ))
}

/// Reads the calendar month from the `YYYY-MM` prefix of a cell; anything
/// after it is ignored.
fn parse_period(raw: &str) -> Option<YearMonth> {
    let date = Date::parse(&format!("{}-01", raw.get(..7)?), &CSV_DATE_FMT).ok()?;
    Some(date.into())
}

fn parse_record(
    record: &StringRecord,
    date_index: usize,
    high_index: usize,
) -> Result<PricePoint> {
    let line = record.position().map_or(0, |p| p.line());
    let malformed = |reason: String| AnalysisError::MalformedRecord { line, reason };

    let label = record
        .get(date_index)
        .ok_or_else(|| malformed("missing Date field".to_string()))?;
    let period =
        parse_period(label).ok_or_else(|| malformed(format!("invalid date '{label}'")))?;

    let high = record
        .get(high_index)
        .ok_or_else(|| malformed("missing High field".to_string()))?;
    let high = high
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .ok_or_else(|| malformed(format!("High field '{high}' is not a valid float")))?;

    Ok(PricePoint {
        label: label.to_string(),
        period,
        high,
    })
}

/// Parses price rows from any reader, keeping rows inside `range` and
/// dropping repeated consecutive months.
pub fn read_price_series<R: io::Read>(reader: R, range: YearRange) -> Result<PriceSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let (date_index, high_index) = get_column_indices(rdr.headers()?)?;

    let mut points = Vec::new();
    let mut rows = 0usize;
    for record in rdr.records() {
        let point = parse_record(&record?, date_index, high_index)?;
        rows += 1;
        if range.contains(point.period.year) {
            points.push(point);
        }
    }

    let in_range = points.len();
    let series = PriceSeries::from_points(points);
    tracing::info!(
        rows,
        in_range,
        kept = series.len(),
        "loaded index price series"
    );
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            tracing::debug!(from = %first.period, until = %last.period, "price series span")
        }
        _ => tracing::warn!(?range, "no price rows left after year filtering"),
    }
    Ok(series)
}

pub fn load_price_series<P: AsRef<Path>>(file_path: P, range: YearRange) -> Result<PriceSeries> {
    let path = file_path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AnalysisError::FileNotFound(path.to_path_buf()),
        _ => AnalysisError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    tracing::debug!(path = %path.display(), "reading index file");
    read_price_series(file, range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn read(csv: &str, range: YearRange) -> Result<PriceSeries> {
        read_price_series(csv.as_bytes(), range)
    }

    #[test]
    fn parses_month_and_day_dates() {
        assert_eq!(
            parse_period("2020-03"),
            Some(YearMonth::new(2020, Month::March))
        );
        assert_eq!(
            parse_period("1999-12-31"),
            Some(YearMonth::new(1999, Month::December))
        );
        assert_eq!(
            parse_period("2001-07-02 00:00:00"),
            Some(YearMonth::new(2001, Month::July))
        );
        assert_eq!(
            parse_period("2020-03-xx"),
            Some(YearMonth::new(2020, Month::March))
        );
        assert_eq!(
            parse_period("2020-02-30"),
            Some(YearMonth::new(2020, Month::February))
        );
        assert_eq!(parse_period("2020-13"), None);
        assert_eq!(parse_period("2020-1"), None);
        assert_eq!(parse_period("03/2020"), None);
        assert_eq!(parse_period(""), None);
    }

    #[test]
    fn reads_and_ignores_extra_columns() {
        let series = read(
            "Date,Open,High,Low\n2020-01-01,1,10.5,0\n2020-02-01,1,11,0\n",
            YearRange::default(),
        )
        .unwrap();
        assert_eq!(series.highs(), vec![10.5, 11.0]);
        assert_eq!(series.last().unwrap().label, "2020-02-01");
    }

    #[test]
    fn drops_repeated_month_rows() {
        let series = read(
            "Date,High\n2020-01-01,100\n2020-01-31,150\n2020-02-01,200\n",
            YearRange::default(),
        )
        .unwrap();
        assert_eq!(series.highs(), vec![100., 200.]);
    }

    #[test]
    fn filters_by_inclusive_year_range() {
        let csv = "Date,High\n1999-12,1\n2000-01,2\n2001-06,3\n2002-01,4\n";
        let series = read(csv, YearRange::new(Some(2000), Some(2001))).unwrap();
        assert_eq!(series.highs(), vec![2., 3.]);

        let empty = read(csv, YearRange::new(Some(2050), None)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn missing_high_column_is_malformed() {
        let err = read("Date,Close\n2020-01,1\n", YearRange::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn non_numeric_high_is_malformed() {
        let err = read("Date,High\n2020-01,1\n2020-02,n/a\n", YearRange::default()).unwrap_err();
        match err {
            AnalysisError::MalformedRecord { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("n/a"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_row_is_malformed() {
        let err = read("Date,Open,High\n2020-01,1\n", YearRange::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn day_part_of_date_is_not_validated() {
        let series = read(
            "Date,High\n2020-01-xx,1\n2020-02-30,2\n",
            YearRange::default(),
        )
        .unwrap();
        assert_eq!(series.highs(), vec![1., 2.]);
        assert_eq!(series.last().unwrap().label, "2020-02-30");
    }

    #[test]
    fn bad_date_is_malformed() {
        let err = read("Date,High\nJan 2020,1\n", YearRange::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRecord { .. }));
    }
}
