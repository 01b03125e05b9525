//! Chart payloads handed to an external plotting tool.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::aggregate::{self, FatalityBucket, StateSeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

pub fn fatality_chart(buckets: &[FatalityBucket]) -> LineChart {
    LineChart {
        title: "Probability of death vs age".to_string(),
        x_label: "Age".to_string(),
        y_label: "Deaths / (Deaths+Recoveries)".to_string(),
        y_range: Some([0.0, 1.2]),
        x: buckets.iter().map(|bucket| bucket.age as f64).collect(),
        series: vec![Series {
            label: None,
            values: aggregate::fatality_ratios(buckets),
        }],
    }
}

/// Plotted against the day's position in the tally, not its offset.
pub fn time_series_chart(series: &StateSeries) -> LineChart {
    let line = |label: &str, values: &[u64]| Series {
        label: Some(label.to_string()),
        values: values.iter().map(|&v| v as f64).collect(),
    };
    LineChart {
        title: "Time series of early pandemic".to_string(),
        x_label: "Days into Pandemic".to_string(),
        y_label: "Number of People".to_string(),
        y_range: None,
        x: (0..series.days()).map(|day| day as f64).collect(),
        series: vec![
            line("Infected", &series.infected),
            line("Recovered", &series.recovered),
            line("Dead", &series.dead),
        ],
    }
}

/// Persists one chart as an artifact at `path`.
pub trait ChartRenderer {
    fn render(&self, chart: &LineChart, path: &Path) -> anyhow::Result<()>;
}

/// Writes the chart payload as pretty JSON for a downstream plotter.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonChartRenderer;

impl ChartRenderer for JsonChartRenderer {
    fn render(&self, chart: &LineChart, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create chart file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, chart)
            .with_context(|| format!("failed to write chart {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_chart_pairs_buckets_with_ratios() {
        let buckets = vec![
            FatalityBucket {
                age: 5,
                deaths: 1,
                recoveries: 3,
            },
            FatalityBucket {
                age: 10,
                deaths: 0,
                recoveries: 0,
            },
        ];
        let chart = fatality_chart(&buckets);
        assert_eq!(chart.x, vec![5.0, 10.0]);
        assert_eq!(chart.series[0].values, vec![0.25, 1.0]);
        assert_eq!(chart.y_range, Some([0.0, 1.2]));
        assert_eq!(chart.y_label, "Deaths / (Deaths+Recoveries)");
    }

    #[test]
    fn time_series_chart_uses_day_positions() {
        let series = StateSeries {
            infected: vec![1, 3, 9],
            recovered: vec![0, 0, 4],
            dead: vec![0, 1, 0],
        };
        let chart = time_series_chart(&series);
        assert_eq!(chart.x, vec![0.0, 1.0, 2.0]);
        let labels: Vec<_> = chart.series.iter().filter_map(|s| s.label.as_deref()).collect();
        assert_eq!(labels, vec!["Infected", "Recovered", "Dead"]);
        assert_eq!(chart.series[2].values, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn json_renderer_persists_the_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        let chart = time_series_chart(&StateSeries {
            infected: vec![2],
            recovered: vec![0],
            dead: vec![1],
        });
        JsonChartRenderer.render(&chart, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["x_label"], "Days into Pandemic");
        assert_eq!(written["series"][0]["values"][0], 2.0);
        assert!(written.get("y_range").is_none());
    }
}
