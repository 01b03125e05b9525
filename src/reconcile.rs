//! Repairs rows whose postal code or temperature was split across two fields
//! by an upstream delimiter, bringing every row back to the canonical shape.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{CANONICAL_FIELDS, FIELD_POSTAL, FIELD_TEMPERATURE};
use crate::tsv;

const STAGE: &str = "reconcile";

/// Most fields a row can carry: one extra postal fragment plus one extra
/// temperature fragment.
const MAX_FIELDS: usize = CANONICAL_FIELDS + 2;

/// Where a split-off fragment lands, directly after the field it belongs to.
const POSTAL_FRAGMENT: usize = FIELD_POSTAL + 1;
const TEMPERATURE_FRAGMENT: usize = FIELD_TEMPERATURE + 1;

/// Leading-character class of the field inspected by a repair rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    Digit,
    /// Second half of a split "NOT APPLICABLE" placeholder.
    NotApplicable,
    Other,
}

impl Lead {
    pub fn of(field: &str) -> Self {
        match field.chars().next() {
            Some(c) if c.is_ascii_digit() => Lead::Digit,
            Some('A') => Lead::NotApplicable,
            _ => Lead::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Append the postal fragment in field 6 to field 5.
    JoinPostalFragment,
    /// Postal arrived whole but with an embedded space.
    StripPostalSpaces,
    /// Field 8 is the fractional part of the temperature in field 7.
    JoinTemperatureDecimal,
    /// Field 8 is a unit suffix of the temperature in field 7.
    JoinTemperatureSuffix,
}

/// Postal rule, keyed on (field count, lead of field 6).
pub fn postal_rule(field_count: usize, lead: Lead) -> Repair {
    match (field_count, lead) {
        (10 | 11, Lead::Digit | Lead::NotApplicable) => Repair::JoinPostalFragment,
        _ => Repair::StripPostalSpaces,
    }
}

/// Temperature rule, keyed on (field count after the postal rule, lead of field 8).
pub fn temperature_rule(field_count: usize, lead: Lead) -> Option<Repair> {
    match (field_count, lead) {
        (10, Lead::Digit) => Some(Repair::JoinTemperatureDecimal),
        (10, _) => Some(Repair::JoinTemperatureSuffix),
        _ => None,
    }
}

fn apply(repair: Repair, fields: &mut Vec<String>) {
    match repair {
        Repair::JoinPostalFragment => {
            let fragment = fields.remove(POSTAL_FRAGMENT);
            fields[FIELD_POSTAL].push_str(&fragment);
        }
        Repair::StripPostalSpaces => {
            fields[FIELD_POSTAL].retain(|c| c != ' ');
        }
        Repair::JoinTemperatureDecimal => {
            let fraction = without_spaces(&fields.remove(TEMPERATURE_FRAGMENT));
            let temperature = &mut fields[FIELD_TEMPERATURE];
            temperature.push('.');
            temperature.push_str(&fraction);
        }
        Repair::JoinTemperatureSuffix => {
            let suffix = without_spaces(&fields.remove(TEMPERATURE_FRAGMENT));
            fields[FIELD_TEMPERATURE].push_str(&suffix);
        }
    }
}

fn without_spaces(value: &str) -> String {
    value.chars().filter(|&c| c != ' ').collect()
}

/// Returns the row in canonical shape, or `MalformedField` when no rule gets
/// it there.
pub fn reconcile_fields(mut fields: Vec<String>) -> Result<Vec<String>> {
    if !(CANONICAL_FIELDS..=MAX_FIELDS).contains(&fields.len()) {
        return Err(field_count_error(&fields));
    }

    let postal = postal_rule(fields.len(), Lead::of(&fields[POSTAL_FRAGMENT]));
    debug!(?postal, fields = fields.len(), "postal repair");
    apply(postal, &mut fields);

    let temperature = temperature_rule(fields.len(), Lead::of(&fields[TEMPERATURE_FRAGMENT]));
    if let Some(temperature) = temperature {
        debug!(?temperature, "temperature repair");
        apply(temperature, &mut fields);
    }

    if fields.len() != CANONICAL_FIELDS {
        return Err(field_count_error(&fields));
    }
    Ok(fields)
}

fn field_count_error(fields: &[String]) -> PipelineError {
    PipelineError::malformed(
        "row",
        &fields.join("\t"),
        format!("{} fields cannot be reconciled to {}", fields.len(), CANONICAL_FIELDS),
    )
}

pub fn reconcile_rows(rows: Vec<tsv::NumberedRow>) -> Result<Vec<Vec<String>>> {
    rows.into_iter()
        .map(|(line, fields)| reconcile_fields(fields).map_err(|err| err.at_line(STAGE, line)))
        .collect()
}

pub fn run_stage(input: &Path, output: &Path) -> Result<usize> {
    let rows = tsv::read_rows(input)?;
    let reconciled = reconcile_rows(rows)?;
    tsv::write_rows(output, &reconciled)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = reconciled.len(),
        "columns reconciled"
    );
    Ok(reconciled.len())
}
