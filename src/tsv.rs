use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// A parsed input row tagged with its 1-based line number.
pub type NumberedRow = (usize, Vec<String>);

/// Reads raw lines, before any delimiter is known.
pub fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        lines.push((index + 1, line.trim_end_matches('\r').to_string()));
    }
    Ok(lines)
}

pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads tab-separated rows, skipping blank lines. Field counts may vary
/// between rows and quote characters are kept literally.
pub fn read_rows(path: &Path) -> Result<Vec<NumberedRow>> {
    let rows = read_lines(path)?
        .into_iter()
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| (number, line.split('\t').map(str::to_string).collect()))
        .collect();
    Ok(rows)
}

pub fn write_rows<I, R>(path: &Path, rows: I) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
