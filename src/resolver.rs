//! Builds typed patient records from normalized rows and folds repeat
//! observations of one patient into a single record.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{
    CaseState, PatientRecord, SexGender, CANONICAL_FIELDS, FIELD_BIRTH_DATE, FIELD_NUMBER,
    FIELD_POSTAL, FIELD_REPORT_DATE, FIELD_SEX_GENDER, FIELD_STATUS, FIELD_SYMPTOM_DAYS,
    FIELD_TEMPERATURE,
};
use crate::tsv;

const STAGE: &str = "resolve";

/// Readings above this are taken to be Fahrenheit.
const FAHRENHEIT_THRESHOLD: f64 = 45.0;

const OUT_OF_REGION_POSTAL: &str = "000";

/// Converts a raw reading to Celsius rounded to hundredths. `N...` readings
/// (not applicable) become `0.0`. Both `,` and `-` are read as decimal points;
/// the latter appears because date normalization rewrote every `.`.
pub fn canonical_temperature(raw: &str) -> Result<f64> {
    if raw.starts_with('N') {
        return Ok(0.0);
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, 'C' | 'F' | '°'))
        .map(|c| match c {
            ',' | '-' => '.',
            c => c,
        })
        .collect();
    let value: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| PipelineError::malformed("temperature", raw, "not a number"))?;
    if !value.is_finite() {
        return Err(PipelineError::malformed("temperature", raw, "not a finite number"));
    }

    let celsius = if value > FAHRENHEIT_THRESHOLD {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    };
    Ok(round_hundredths(celsius))
}

/// Two decimals, exact ties going to the even neighbour.
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// First three characters of a Montreal-area (`H...`) postal code; anything
/// else is out of region.
pub fn canonical_postal(raw: &str) -> Result<String> {
    match raw.chars().next() {
        None => Err(PipelineError::malformed("postal", raw, "empty")),
        Some('H') => Ok(raw.chars().take(3).collect()),
        Some(_) => {
            debug!(postal = raw, "out-of-region postal code zeroed");
            Ok(OUT_OF_REGION_POSTAL.to_string())
        }
    }
}

/// Whole readings keep one decimal place (`39.0`), others print in shortest form.
pub fn format_reading(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::malformed(field, value, "not an integer"))
}

impl PatientRecord {
    /// Builds a record from one normalized row, whose date fields already hold
    /// the day offset and age.
    pub fn from_row<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() != CANONICAL_FIELDS {
            let joined: Vec<&str> = fields.iter().map(|field| field.as_ref()).collect();
            return Err(PipelineError::malformed(
                "row",
                &joined.join("\t"),
                format!("expected {} fields, found {}", CANONICAL_FIELDS, fields.len()),
            ));
        }
        let field = move |index: usize| fields[index].as_ref();

        let status = field(FIELD_STATUS);
        let state = CaseState::from_code(status.trim())
            .ok_or_else(|| PipelineError::malformed("status", status, "expected I, R or D"))?;

        Ok(PatientRecord {
            number: parse_int("patient number", field(FIELD_NUMBER))?,
            day_diagnosed: parse_int("day offset", field(FIELD_REPORT_DATE))?,
            age: parse_int("age", field(FIELD_BIRTH_DATE))?,
            sex_gender: SexGender::from_token(field(FIELD_SEX_GENDER).trim()),
            postal: canonical_postal(field(FIELD_POSTAL))?,
            state,
            days_symptomatic: parse_int("symptomatic days", field(FIELD_SYMPTOM_DAYS))?,
            temperatures: vec![canonical_temperature(field(FIELD_TEMPERATURE))?],
        })
    }

    fn identity(&self) -> String {
        format!("{}/{}/{}", self.number, self.sex_gender.as_str(), self.postal)
    }

    /// Folds a later observation of the same patient into this record. Number,
    /// sex/gender and postal must agree; state and symptomatic days take the
    /// newer values and the newer readings are appended.
    pub fn merge(&mut self, newer: PatientRecord) -> Result<()> {
        if newer.number != self.number
            || newer.sex_gender != self.sex_gender
            || newer.postal != self.postal
        {
            return Err(PipelineError::PatientConflict {
                number: self.number,
                existing: self.identity(),
                incoming: newer.identity(),
            });
        }

        self.state = newer.state;
        self.days_symptomatic = newer.days_symptomatic;
        self.temperatures.extend(newer.temperatures);
        Ok(())
    }
}

impl fmt::Display for PatientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readings: Vec<String> = self.temperatures.iter().map(|t| format_reading(*t)).collect();
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.number,
            self.age,
            self.sex_gender.as_str(),
            self.postal,
            self.day_diagnosed,
            self.state.as_str(),
            self.days_symptomatic,
            readings.join(";")
        )
    }
}

/// Parses a resolved line as written by the `Display` impl.
impl FromStr for PatientRecord {
    type Err = PipelineError;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [number, age, sex_gender, postal, day, state, days, readings] = fields.as_slice() else {
            return Err(PipelineError::malformed(
                "patient record",
                line,
                "expected 8 tab-separated fields",
            ));
        };

        let temperatures = readings
            .split(';')
            .map(|reading| {
                reading
                    .parse::<f64>()
                    .map_err(|_| PipelineError::malformed("temperature", reading, "not a number"))
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(PatientRecord {
            number: parse_int("patient number", number)?,
            day_diagnosed: parse_int("day offset", day)?,
            age: parse_int("age", age)?,
            sex_gender: SexGender::from_token(sex_gender),
            postal: postal.to_string(),
            state: CaseState::from_code(state)
                .ok_or_else(|| PipelineError::malformed("status", state, "expected I, R or D"))?,
            days_symptomatic: parse_int("symptomatic days", days)?,
            temperatures,
        })
    }
}

/// Resolved patients keyed and ordered by patient number.
#[derive(Debug, Default, Clone)]
pub struct PatientRegistry {
    patients: BTreeMap<i64, PatientRecord>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a first observation or merges a repeat one.
    pub fn observe(&mut self, record: PatientRecord) -> Result<()> {
        match self.patients.entry(record.number) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => slot.get_mut().merge(record)?,
        }
        Ok(())
    }

    /// Records in ascending patient-number order.
    pub fn records(&self) -> impl Iterator<Item = &PatientRecord> {
        self.patients.values()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

pub fn resolve_rows(rows: Vec<tsv::NumberedRow>, registry: &mut PatientRegistry) -> Result<usize> {
    let observations = rows.len();
    for (line, fields) in rows {
        PatientRecord::from_row(&fields)
            .and_then(|record| registry.observe(record))
            .map_err(|err| err.at_line(STAGE, line))?;
    }
    Ok(observations)
}

/// Resolves every row of `input` and writes the patients to `output`,
/// returning the number of patients.
pub fn run_stage(input: &Path, output: &Path, registry: &mut PatientRegistry) -> Result<usize> {
    let rows = tsv::read_rows(input)?;
    let observations = resolve_rows(rows, registry)?;
    tsv::write_lines(output, registry.records().map(ToString::to_string))?;
    info!(
        input = %input.display(),
        output = %output.display(),
        observations,
        patients = registry.len(),
        "patients resolved"
    );
    Ok(registry.len())
}
