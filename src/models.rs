use indexmap::IndexMap;
use serde::Serialize;

/// Number of fields in a reconciled case row:
/// source, patient number, report date, birth date, sex/gender, postal,
/// status, temperature, symptomatic days.
pub const CANONICAL_FIELDS: usize = 9;

pub const FIELD_NUMBER: usize = 1;
pub const FIELD_REPORT_DATE: usize = 2;
pub const FIELD_BIRTH_DATE: usize = 3;
pub const FIELD_SEX_GENDER: usize = 4;
pub const FIELD_POSTAL: usize = 5;
pub const FIELD_STATUS: usize = 6;
pub const FIELD_TEMPERATURE: usize = 7;
pub const FIELD_SYMPTOM_DAYS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexGender {
    Female,
    Male,
    Unspecified,
}

impl SexGender {
    /// Exact-match lookup; anything outside the table is `X`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "F" | "FEMALE" | "FEMME" | "GIRL" | "WOMAN" => SexGender::Female,
            "M" | "MALE" | "H" | "HOMME" | "BOY" | "MAN" => SexGender::Male,
            _ => SexGender::Unspecified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SexGender::Female => "F",
            SexGender::Male => "M",
            SexGender::Unspecified => "X",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Infected,
    Recovered,
    Dead,
}

impl CaseState {
    /// Maps a raw status by its first letter. `M` is a death from another
    /// cause and counts as dead.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.chars().next()?.to_ascii_uppercase() {
            'I' => Some(CaseState::Infected),
            'R' => Some(CaseState::Recovered),
            'D' | 'M' => Some(CaseState::Dead),
            _ => None,
        }
    }

    /// Parses an already canonical single-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(CaseState::Infected),
            "R" => Some(CaseState::Recovered),
            "D" => Some(CaseState::Dead),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaseState::Infected => "I",
            CaseState::Recovered => "R",
            CaseState::Dead => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    #[serde(rename = "I")]
    pub infected: u64,
    #[serde(rename = "R")]
    pub recovered: u64,
    #[serde(rename = "D")]
    pub dead: u64,
}

impl DayCounts {
    pub fn record(&mut self, state: CaseState) {
        match state {
            CaseState::Infected => self.infected += 1,
            CaseState::Recovered => self.recovered += 1,
            CaseState::Dead => self.dead += 1,
        }
    }
}

/// Per-day state counts, iterated in the order days were first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DayStateTally {
    days: IndexMap<i64, DayCounts>,
}

impl DayStateTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, day: i64, state: CaseState) {
        self.days.entry(day).or_default().record(state);
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &DayCounts)> {
        self.days.iter().map(|(day, counts)| (*day, counts))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub number: i64,
    pub day_diagnosed: i64,
    pub age: i64,
    pub sex_gender: SexGender,
    pub postal: String,
    pub state: CaseState,
    pub days_symptomatic: i64,
    pub temperatures: Vec<f64>,
}

/// Row counts produced by one full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub raw_rows: usize,
    pub reconciled_rows: usize,
    pub normalized_rows: usize,
    pub patients: usize,
    pub days: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_gender_table_is_exact_match() {
        assert_eq!(SexGender::from_token("FEMME"), SexGender::Female);
        assert_eq!(SexGender::from_token("H"), SexGender::Male);
        assert_eq!(SexGender::from_token("BOY"), SexGender::Male);
        assert_eq!(SexGender::from_token("Woman"), SexGender::Unspecified);
        assert_eq!(SexGender::from_token("NB"), SexGender::Unspecified);
    }

    #[test]
    fn status_maps_by_first_letter() {
        assert_eq!(CaseState::from_status("INFECTÉE"), Some(CaseState::Infected));
        assert_eq!(CaseState::from_status("recovered"), Some(CaseState::Recovered));
        assert_eq!(CaseState::from_status("DEAD"), Some(CaseState::Dead));
        assert_eq!(CaseState::from_status("MORT"), Some(CaseState::Dead));
        assert_eq!(CaseState::from_status("UNKNOWN"), None);
        assert_eq!(CaseState::from_status(""), None);
    }

    #[test]
    fn tally_keeps_first_seen_order() {
        let mut tally = DayStateTally::new();
        tally.record(2, CaseState::Infected);
        tally.record(0, CaseState::Dead);
        tally.record(2, CaseState::Recovered);
        tally.record(2, CaseState::Infected);

        let days: Vec<(i64, DayCounts)> = tally.iter().map(|(day, c)| (day, *c)).collect();
        assert_eq!(
            days,
            vec![
                (
                    2,
                    DayCounts {
                        infected: 2,
                        recovered: 1,
                        dead: 0
                    }
                ),
                (
                    0,
                    DayCounts {
                        infected: 0,
                        recovered: 0,
                        dead: 1
                    }
                ),
            ]
        );
    }

    #[test]
    fn tally_serializes_as_ordered_map() {
        let mut tally = DayStateTally::new();
        tally.record(1, CaseState::Infected);
        tally.record(0, CaseState::Dead);
        let json = serde_json::to_string(&tally).unwrap();
        assert_eq!(
            json,
            r#"{"1":{"I":1,"R":0,"D":0},"0":{"I":0,"R":0,"D":1}}"#
        );
    }
}
