use std::path::{Path, PathBuf};

const CLEANED_FILE: &str = "stage1.tsv";
const RECONCILED_FILE: &str = "stage2.tsv";
const NORMALIZED_FILE: &str = "stage3.tsv";
const PATIENTS_FILE: &str = "stage4.tsv";
const FATALITY_CHART_FILE: &str = "fatality_by_age.json";
const TIME_SERIES_CHART_FILE: &str = "time_series.json";
const REPORT_FILE: &str = "report.md";

/// Where a full run reads raw cases from and writes each stage's output.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub work_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            work_dir: work_dir.into(),
        }
    }

    fn in_work_dir(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.in_work_dir(CLEANED_FILE)
    }

    pub fn reconciled_path(&self) -> PathBuf {
        self.in_work_dir(RECONCILED_FILE)
    }

    pub fn normalized_path(&self) -> PathBuf {
        self.in_work_dir(NORMALIZED_FILE)
    }

    pub fn patients_path(&self) -> PathBuf {
        self.in_work_dir(PATIENTS_FILE)
    }

    pub fn fatality_chart_path(&self) -> PathBuf {
        self.in_work_dir(FATALITY_CHART_FILE)
    }

    pub fn time_series_chart_path(&self) -> PathBuf {
        self.in_work_dir(TIME_SERIES_CHART_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.in_work_dir(REPORT_FILE)
    }
}
