use std::path::Path;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::tsv;

const STAGE: &str = "clean";

/// Candidate separators in tie-break priority order.
const CANDIDATES: [char; 3] = [' ', '\t', ','];

/// Picks the most frequent of space, tab and comma. Ties go to the earlier
/// candidate.
pub fn detect_delimiter(line: &str) -> Result<char> {
    let mut best = None;
    let mut best_count = 0;
    for candidate in CANDIDATES {
        let count = line.matches(candidate).count();
        if count > best_count {
            best = Some(candidate);
            best_count = count;
        }
    }
    best.ok_or(PipelineError::NoDelimiterFound)
}

/// Rewrites the detected delimiter to tab, date separators (`/`, `.`) to `-`,
/// and upper-cases the result.
pub fn normalize_line(line: &str) -> Result<String> {
    let delimiter = detect_delimiter(line)?;
    let rewritten: String = line
        .chars()
        .map(|c| match c {
            c if c == delimiter => '\t',
            '/' | '.' => '-',
            c => c,
        })
        .collect();
    Ok(rewritten.to_uppercase())
}

pub fn normalize_lines(lines: &[(usize, String)]) -> Result<Vec<String>> {
    lines
        .iter()
        .map(|(line_no, line)| normalize_line(line).map_err(|err| err.at_line(STAGE, *line_no)))
        .collect()
}

/// Normalizes every line of `input` into `output`, returning the line count.
pub fn run_stage(input: &Path, output: &Path) -> Result<usize> {
    let lines = tsv::read_lines(input)?;
    let normalized = normalize_lines(&lines)?;
    tsv::write_lines(output, &normalized)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = normalized.len(),
        "delimiters normalized"
    );
    Ok(normalized.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_common_delimiter_wins() {
        assert_eq!(detect_delimiter("0 1 2,3").unwrap(), ' ');
        assert_eq!(
            detect_delimiter("1 1 2021.12.9 1998.7.9 Femme H4C 2H6 Infectée 38,8 5").unwrap(),
            ' '
        );
        assert_eq!(
            detect_delimiter("0\t2\t2021 2 2\t 2002.2.2\tH\tH4C1N5\tInfecte").unwrap(),
            '\t'
        );
        assert_eq!(detect_delimiter("a,b,c d").unwrap(), ',');
    }

    #[test]
    fn ties_follow_candidate_priority() {
        assert_eq!(detect_delimiter("a b\tc").unwrap(), ' ');
        assert_eq!(detect_delimiter("a\tb,c").unwrap(), '\t');
    }

    #[test]
    fn missing_delimiter_is_an_error() {
        assert!(matches!(
            detect_delimiter("1234"),
            Err(PipelineError::NoDelimiterFound)
        ));
        assert!(matches!(
            detect_delimiter(""),
            Err(PipelineError::NoDelimiterFound)
        ));
    }

    #[test]
    fn line_is_tabbed_dashed_and_upper_cased() {
        let line = "1,7,2021/12/9,1998.7.9,Femme,H4C 2H6,Infectée,38.8 C,5";
        assert_eq!(
            normalize_line(line).unwrap(),
            "1\t7\t2021-12-9\t1998-7-9\tFEMME\tH4C 2H6\tINFECTÉE\t38-8 C\t5"
        );
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let once = normalize_line("0 3 2020/3/1 1980.5.17 homme H2X 1Y4 infecte 37,2 4").unwrap();
        let twice = normalize_line(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn failing_line_is_identified() {
        let lines = vec![(1, "a b".to_string()), (2, "nodelimiter".to_string())];
        let err = normalize_lines(&lines).unwrap_err();
        assert!(matches!(err, PipelineError::AtLine { line: 2, .. }));
    }

    #[test]
    fn stage_writes_one_line_per_input_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.txt");
        let output = dir.path().join("stage1.tsv");
        std::fs::write(&input, "0 1 2020/3/1\n1,2,2020.3.2\n").unwrap();

        assert_eq!(run_stage(&input, &output).unwrap(), 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "0\t1\t2020-3-1\n1\t2\t2020-3-2\n"
        );
    }

    #[test]
    fn failed_stage_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.txt");
        let output = dir.path().join("stage1.tsv");
        std::fs::write(&input, "0 1 2\n1234\n").unwrap();

        assert!(run_stage(&input, &output).is_err());
        assert!(!output.exists());
    }
}
