use crate::ExportError;
use crate::snapshot::write_snapshot;
use conceptmap_core::GraphMetrics;
use conceptmap_graph::GraphModel;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Image,NumNodes,NumEdges,Width,Depth,HSS,NumMainIdeas,MaxNumDetails,NumCrosslinks,MaxCrosslinkDist,PriorKnowledge,Questions";

/// Columns after the image name.
const VALUE_COLUMNS: usize = 11;

/// One logged image: its name plus the metric snapshot taken at export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub image: String,
    pub metrics: GraphMetrics,
    pub prior_knowledge: Option<i64>,
    pub questions: Option<i64>,
}

impl LogRow {
    /// Snapshot a completable model.
    pub fn from_model(model: &GraphModel) -> Result<Self, ExportError> {
        if !model.is_completable() {
            return Err(ExportError::NotReady);
        }
        let image = model
            .image_path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ExportError::NotReady)?;

        Ok(Self {
            image,
            metrics: model.metrics(),
            prior_knowledge: model.prior_knowledge(),
            questions: model.questions(),
        })
    }

    /// Render as one CSV line, without a terminator. The image name is
    /// quoted when it holds a comma or starts with a quote, with embedded
    /// quotes doubled.
    pub fn to_csv(&self) -> String {
        let image = if self.image.contains(',') || self.image.starts_with('"') {
            format!("\"{}\"", self.image.replace('"', "\"\""))
        } else {
            self.image.clone()
        };
        let m = &self.metrics;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            image,
            m.num_nodes,
            m.num_edges,
            m.width,
            m.depth,
            m.hss(),
            m.num_main_ideas,
            m.max_num_details,
            m.num_crosslinks,
            m.max_crosslink_dist,
            optional(self.prior_knowledge),
            optional(self.questions),
        )
    }

    /// Parse a data line. `line_number` is 1-based and only used for errors.
    pub fn parse(line_number: usize, line: &str) -> Result<Self, ExportError> {
        let malformed = |reason: String| ExportError::MalformedRow {
            line: line_number,
            reason,
        };

        let (image, rest) = split_first_column(line);
        let rest = rest
            .strip_prefix(',')
            .ok_or_else(|| malformed("missing values after image name".to_string()))?;

        let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
        if fields.len() != VALUE_COLUMNS {
            return Err(malformed(format!(
                "expected {VALUE_COLUMNS} values, found {}",
                fields.len()
            )));
        }

        let count = |i: usize| {
            fields[i]
                .parse::<usize>()
                .map_err(|e| malformed(format!("column {}: {e}", i + 2)))
        };
        let annotation = |i: usize| {
            if fields[i].is_empty() {
                Ok(None)
            } else {
                fields[i]
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|e| malformed(format!("column {}: {e}", i + 2)))
            }
        };
        let depth = fields[3]
            .parse::<i32>()
            .map_err(|e| malformed(format!("column 5: {e}")))?;

        Ok(Self {
            image: image.into_owned(),
            metrics: GraphMetrics {
                num_nodes: count(0)?,
                num_edges: count(1)?,
                width: count(2)?,
                depth,
                num_main_ideas: count(5)?,
                max_num_details: count(6)?,
                num_crosslinks: count(7)?,
                max_crosslink_dist: count(8)?,
            },
            prior_knowledge: annotation(9)?,
            questions: annotation(10)?,
        })
    }
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Image name in the first column of a log line.
///
/// A leading quote runs the field to the next lone quote, reading `""` as
/// a literal quote; otherwise the field ends at the first comma.
pub fn first_column(line: &str) -> Cow<'_, str> {
    split_first_column(line).0
}

/// The first column and whatever follows its closing quote.
fn split_first_column(line: &str) -> (Cow<'_, str>, &str) {
    let Some(quoted) = line.strip_prefix('"') else {
        return match line.find(',') {
            Some(end) => (Cow::Borrowed(&line[..end]), &line[end..]),
            None => (Cow::Borrowed(line), ""),
        };
    };

    let mut name = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
        } else if chars.next_if(|&(_, next)| next == '"').is_some() {
            name.push('"');
        } else {
            return (Cow::Owned(name), &quoted[i + 1..]);
        }
    }
    (Cow::Owned(name), "")
}

/// Append-only CSV log of processed images.
#[derive(Debug, Clone)]
pub struct ExportLog {
    path: PathBuf,
}

impl ExportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `row`, writing the header first when the log is new or empty.
    pub fn append(&self, row: &LogRow) -> Result<(), ExportError> {
        let existing_len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let mut out = String::new();
        if existing_len == 0 {
            out.push_str(HEADER);
            out.push('\n');
        } else if !self.ends_with_newline()? {
            out.push('\n');
        }
        out.push_str(&row.to_csv());
        out.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(out.as_bytes())?;
        file.flush()?;

        tracing::info!("Logged {} to {}", row.image, self.path.display());
        Ok(())
    }

    fn ends_with_newline(&self) -> Result<bool, ExportError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(matches!(last[0], b'\n' | b'\r'))
    }

    /// True when any non-empty line's first column equals `image_name`.
    /// A missing log covers nothing.
    pub fn contains_image(&self, image_name: &str) -> Result<bool, ExportError> {
        let Some(lines) = self.lines()? else {
            return Ok(false);
        };
        for line in lines {
            let line = line?;
            if !line.is_empty() && first_column(&line) == image_name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// First-column names of every data line (header skipped).
    pub fn processed_images(&self) -> Result<HashSet<String>, ExportError> {
        let mut processed = HashSet::new();
        let Some(lines) = self.lines()? else {
            return Ok(processed);
        };
        for line in lines.skip(1) {
            let line = line?;
            if !line.is_empty() {
                processed.insert(first_column(&line).into_owned());
            }
        }
        Ok(processed)
    }

    /// Every data row, parsed. Blank lines are skipped.
    pub fn rows(&self) -> Result<Vec<LogRow>, ExportError> {
        let mut rows = Vec::new();
        let Some(lines) = self.lines()? else {
            return Ok(rows);
        };
        for (index, line) in lines.enumerate().skip(1) {
            let line = line?;
            if !line.trim().is_empty() {
                rows.push(LogRow::parse(index + 1, &line)?);
            }
        }
        Ok(rows)
    }

    fn lines(&self) -> Result<Option<std::io::Lines<BufReader<File>>>, ExportError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file).lines())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `image_name` already has a row in the log at `output_path`.
pub fn image_already_logged(output_path: &Path, image_name: &str) -> Result<bool, ExportError> {
    ExportLog::new(output_path).contains_image(image_name)
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub row: LogRow,
    pub log: PathBuf,
    pub snapshot: Option<PathBuf>,
}

/// Append the model's metrics to its output log and optionally save a
/// snapshot of the annotated canvas beside the source image.
pub fn export(model: &GraphModel, snapshot: Option<&RgbaImage>) -> Result<ExportOutcome, ExportError> {
    let row = LogRow::from_model(model)?;
    let (Some(image_path), Some(output_path)) = (model.image_path(), model.output_path()) else {
        return Err(ExportError::NotReady);
    };

    // The row goes last so a failed snapshot leaves the log untouched.
    let snapshot = snapshot
        .map(|canvas| write_snapshot(image_path, canvas))
        .transpose()?;

    ExportLog::new(output_path).append(&row)?;

    Ok(ExportOutcome {
        row,
        log: output_path.to_path_buf(),
        snapshot,
    })
}
