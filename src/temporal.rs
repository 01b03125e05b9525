use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{
    CaseState, DayStateTally, CANONICAL_FIELDS, FIELD_BIRTH_DATE, FIELD_REPORT_DATE, FIELD_STATUS,
};
use crate::tsv;

const STAGE: &str = "dates";

/// Average Gregorian year length used for ages.
const DAYS_PER_YEAR: f64 = 365.2425;

/// Parses `YYYY-M-D`; components may carry surrounding whitespace and need not
/// be zero padded.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = value.split('-').map(str::trim).collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(PipelineError::malformed("date", value, "expected year-month-day"));
    };
    let year: i32 = year
        .parse()
        .map_err(|_| PipelineError::malformed("date", value, "year is not a number"))?;
    let month: u32 = month
        .parse()
        .map_err(|_| PipelineError::malformed("date", value, "month is not a number"))?;
    let day: u32 = day
        .parse()
        .map_err(|_| PipelineError::malformed("date", value, "day is not a number"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PipelineError::malformed("date", value, "no such calendar day"))
}

/// Signed days from `date1` to `date2`; positive when `date2` is later.
pub fn date_diff(date1: &str, date2: &str) -> Result<i64> {
    Ok((parse_date(date2)? - parse_date(date1)?).num_days())
}

/// Whole years between two dates by average year length, truncated toward zero.
/// Not calendar aware, so ages near a birthday may be off by one.
pub fn age_in_years(birth_date: &str, report_date: &str) -> Result<i64> {
    let days = date_diff(birth_date, report_date)?;
    Ok((days as f64 / DAYS_PER_YEAR).trunc() as i64)
}

pub fn canonical_status(status: &str) -> Result<CaseState> {
    CaseState::from_status(status)
        .ok_or_else(|| PipelineError::malformed("status", status, "expected I, R, D or M"))
}

/// Replaces report date, birth date and status with day offset, age and
/// state code, recording the row in `tally`.
pub fn normalize_fields(
    fields: &mut [String],
    index_date: &str,
    tally: &mut DayStateTally,
) -> Result<()> {
    if fields.len() != CANONICAL_FIELDS {
        return Err(PipelineError::malformed(
            "row",
            &fields.join("\t"),
            format!("expected {} fields, found {}", CANONICAL_FIELDS, fields.len()),
        ));
    }

    let report_date = &fields[FIELD_REPORT_DATE];
    let age = age_in_years(&fields[FIELD_BIRTH_DATE], report_date)?;
    let day = date_diff(index_date, report_date)?;
    let state = canonical_status(&fields[FIELD_STATUS])?;

    if age < 0 {
        warn!(age, report_date = %report_date, "birth date after report date");
    }

    tally.record(day, state);
    fields[FIELD_REPORT_DATE] = day.to_string();
    fields[FIELD_BIRTH_DATE] = age.to_string();
    fields[FIELD_STATUS] = state.as_str().to_string();
    Ok(())
}

/// Day zero is the report date of the first row.
pub fn normalize_rows(
    rows: Vec<tsv::NumberedRow>,
    tally: &mut DayStateTally,
) -> Result<Vec<Vec<String>>> {
    let Some(index_date) = rows
        .first()
        .and_then(|(_, fields)| fields.get(FIELD_REPORT_DATE))
        .cloned()
    else {
        return Ok(Vec::new());
    };

    let mut normalized = Vec::with_capacity(rows.len());
    for (line, mut fields) in rows {
        normalize_fields(&mut fields, &index_date, tally).map_err(|err| err.at_line(STAGE, line))?;
        normalized.push(fields);
    }
    Ok(normalized)
}

pub fn run_stage(input: &Path, output: &Path, tally: &mut DayStateTally) -> Result<usize> {
    let rows = tsv::read_rows(input)?;
    let normalized = normalize_rows(rows, tally)?;
    tsv::write_rows(output, &normalized)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = normalized.len(),
        days = tally.len(),
        "dates normalized"
    );
    Ok(normalized.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayCounts;

    fn row(line: usize, text: &str) -> tsv::NumberedRow {
        (line, text.split('\t').map(str::to_string).collect())
    }

    #[test]
    fn date_diff_is_signed() {
        assert_eq!(date_diff("2019-10-31", "2019-11-2").unwrap(), 2);
        assert_eq!(date_diff("2018-10-31", "2000-11-2").unwrap(), -6572);
        assert_eq!(date_diff("2020-3-1", "2020-3-1").unwrap(), 0);
    }

    #[test]
    fn age_uses_average_year_length() {
        assert_eq!(age_in_years("2018-10-31", "2019-11-2").unwrap(), 1);
        assert_eq!(age_in_years("2018-10-31", "2000-11-2").unwrap(), -17);
        // 365 days is short of an average year, a leap year is not.
        assert_eq!(age_in_years("2019-1-1", "2020-1-1").unwrap(), 0);
        assert_eq!(age_in_years("2020-1-1", "2021-1-1").unwrap(), 1);
    }

    #[test]
    fn dates_tolerate_padding_and_whitespace() {
        assert_eq!(
            parse_date(" 2002-02-2").unwrap(),
            NaiveDate::from_ymd_opt(2002, 2, 2).unwrap()
        );
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for value in ["2021 2 2", "2021-2", "2021-13-1", "2021-2-30", "YYYY-1-1"] {
            assert!(
                matches!(parse_date(value), Err(PipelineError::MalformedField { field: "date", .. })),
                "{value} should not parse"
            );
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(canonical_status("MORT").unwrap(), CaseState::Dead);
        assert!(matches!(
            canonical_status("SUSPECT"),
            Err(PipelineError::MalformedField { field: "status", .. })
        ));
    }

    #[test]
    fn rows_become_offsets_ages_and_codes() {
        let rows = vec![
            row(1, "0\t0\t2020-3-1\t1978-2-10\tF\tH3Z2B5\tINFECTÉE\t38-8\t5"),
            row(2, "1\t1\t2020-3-3\t2000-3-3\tHOMME\tH2X1Y4\tMORT\t37\t9"),
            row(3, "0\t2\t2020-3-3\t1990-7-1\tM\tJ4K1A1\tRÉTABLI\t36-9\t2"),
        ];
        let mut tally = DayStateTally::new();
        let normalized = normalize_rows(rows, &mut tally).unwrap();

        assert_eq!(
            normalized[0],
            vec!["0", "0", "0", "42", "F", "H3Z2B5", "I", "38-8", "5"]
        );
        assert_eq!(normalized[1][2], "2");
        assert_eq!(normalized[1][3], "20");
        assert_eq!(normalized[1][6], "D");
        assert_eq!(normalized[2][6], "R");

        let counts: Vec<(i64, DayCounts)> = tally.iter().map(|(day, c)| (day, *c)).collect();
        assert_eq!(
            counts,
            vec![
                (
                    0,
                    DayCounts {
                        infected: 1,
                        recovered: 0,
                        dead: 0
                    }
                ),
                (
                    2,
                    DayCounts {
                        infected: 0,
                        recovered: 1,
                        dead: 1
                    }
                ),
            ]
        );
    }

    #[test]
    fn earlier_reports_get_negative_offsets() {
        let rows = vec![
            row(1, "0\t0\t2020-3-5\t1990-1-1\tF\tH3Z\tI\t37\t1"),
            row(2, "0\t1\t2020-3-2\t1990-1-1\tF\tH3Z\tI\t37\t1"),
        ];
        let mut tally = DayStateTally::new();
        let normalized = normalize_rows(rows, &mut tally).unwrap();
        assert_eq!(normalized[1][2], "-3");
        let days: Vec<i64> = tally.iter().map(|(day, _)| day).collect();
        assert_eq!(days, vec![0, -3]);
    }

    #[test]
    fn bad_row_reports_its_line() {
        let rows = vec![
            row(1, "0\t0\t2020-3-1\t1990-1-1\tF\tH3Z\tI\t37\t1"),
            row(7, "0\t1\t2020-3-1\t1990-1-1\tF\tH3Z\tQ\t37\t1"),
        ];
        let mut tally = DayStateTally::new();
        let err = normalize_rows(rows, &mut tally).unwrap_err();
        assert!(matches!(err, PipelineError::AtLine { line: 7, .. }));
        assert!(matches!(err.root(), PipelineError::MalformedField { field: "status", .. }));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut tally = DayStateTally::new();
        assert!(normalize_rows(Vec::new(), &mut tally).unwrap().is_empty());
        assert!(tally.is_empty());
    }
}
