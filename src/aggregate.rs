use std::collections::BTreeMap;

use crate::models::{CaseState, DayStateTally, PatientRecord};

/// Nearest multiple of five, with remainders 0-2 rounding down and 3-4 up.
pub fn age_bucket(age: i64) -> i64 {
    let fives = age.div_euclid(5);
    match age.rem_euclid(5) {
        0..=2 => fives * 5,
        _ => (fives + 1) * 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FatalityBucket {
    pub age: i64,
    pub deaths: u64,
    pub recoveries: u64,
}

impl FatalityBucket {
    /// Deaths over closed cases. A bucket with no closed cases reports 1.
    pub fn ratio(&self) -> f64 {
        let closed = self.deaths + self.recoveries;
        if closed == 0 {
            1.0
        } else {
            self.deaths as f64 / closed as f64
        }
    }
}

/// Groups patients by age bucket in ascending order. Active cases open their
/// bucket but are not counted.
pub fn fatality_by_age<'a, I>(patients: I) -> Vec<FatalityBucket>
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    let mut buckets: BTreeMap<i64, FatalityBucket> = BTreeMap::new();
    for patient in patients {
        let age = age_bucket(patient.age);
        let bucket = buckets.entry(age).or_insert(FatalityBucket {
            age,
            deaths: 0,
            recoveries: 0,
        });
        match patient.state {
            CaseState::Dead => bucket.deaths += 1,
            CaseState::Recovered => bucket.recoveries += 1,
            CaseState::Infected => {}
        }
    }
    buckets.into_values().collect()
}

pub fn fatality_ratios(buckets: &[FatalityBucket]) -> Vec<f64> {
    buckets.iter().map(FatalityBucket::ratio).collect()
}

/// One `[infected, dead, recovered]` row per tally day, in first-seen order.
pub fn time_series(tally: &DayStateTally) -> Vec<[u64; 3]> {
    tally
        .iter()
        .map(|(_, counts)| [counts.infected, counts.dead, counts.recovered])
        .collect()
}

/// The tally split into per-state series, indexed by day position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSeries {
    pub infected: Vec<u64>,
    pub recovered: Vec<u64>,
    pub dead: Vec<u64>,
}

impl StateSeries {
    pub fn from_tally(tally: &DayStateTally) -> Self {
        let mut series = StateSeries::default();
        for [infected, dead, recovered] in time_series(tally) {
            series.infected.push(infected);
            series.recovered.push(recovered);
            series.dead.push(dead);
        }
        series
    }

    pub fn days(&self) -> usize {
        self.infected.len()
    }
}
