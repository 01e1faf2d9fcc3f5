use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::shared::NUM_AXES;
use crate::normalization::NormalizationType;
use super::summary::{self, Summary};

pub const SUMMARY_FILE_NAME: &str = "summary.json";
pub const AGGREGATE_CSV: &str = "aggregate_summary.csv";
pub const COMPARISON_CSV: &str = "method_comparison.csv";
pub const REPORT_JSON: &str = "aggregate_report.json";

#[remain::sorted]
#[derive(thiserror::Error, Debug)]
pub enum Err {
    #[error("IO error at '{path}': {source}")]
    IoError {
        path: String,
        source: io::Error,
    },
    #[error("No {SUMMARY_FILE_NAME} files found under '{0}'")]
    NoSummaries(String),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> Err + '_ {
    move |source| Err::IoError { path: path.display().to_string(), source }
}


/// One line of the aggregate table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub group: String,
    pub mesh: String,
    pub method: NormalizationType,
    pub n_vertices: usize,
    pub bins: u64,
    pub mse: f64,
    pub mae: f64,
    pub mse_per_axis: [f64; NUM_AXES],
    pub mae_per_axis: [f64; NUM_AXES],
}

impl From<Summary> for AggregateRow {
    fn from(s: Summary) -> Self {
        Self {
            group: s.group,
            mesh: s.mesh,
            method: s.method,
            n_vertices: s.n_vertices,
            bins: s.bins,
            mse: s.mse,
            mae: s.mae,
            mse_per_axis: s.mse_per_axis,
            mae_per_axis: s.mae_per_axis,
        }
    }
}

/// Mean errors of one method over every run that used it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodComparison {
    pub method: NormalizationType,
    pub runs: usize,
    pub mean_mse: f64,
    pub mean_mae: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub generated_at: String,
    pub outputs_dir: String,
    pub rows: usize,
    pub skipped: usize,
    pub methods: Vec<MethodComparison>,
}


/// Recursively lists every summary file below `dir`, sorted by path.
pub fn find_summaries<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Err> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), Err> {
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.file_name().is_some_and(|n| n == SUMMARY_FILE_NAME) {
                out.push(path);
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    walk(dir.as_ref(), &mut out)?;
    out.sort();
    Ok(out)
}

/// Reads every summary below `outputs_dir`. Unreadable summaries are logged and counted
/// in the second return value instead of failing the whole collection.
pub fn collect_rows<P: AsRef<Path>>(outputs_dir: P) -> Result<(Vec<AggregateRow>, usize), Err> {
    let mut rows = Vec::new();
    let mut skipped = 0;
    for path in find_summaries(&outputs_dir)? {
        match Summary::read_json(&path) {
            Ok(s) => rows.push(AggregateRow::from(s)),
            Err(e) => {
                skipped += 1;
                log_skipped(&path, &e);
            },
        }
    }
    rows.sort_by(|a, b| {
        (&a.group, &a.mesh, a.method).cmp(&(&b.group, &b.mesh, b.method))
    });
    Ok((rows, skipped))
}

fn log_skipped(path: &Path, e: &summary::Err) {
    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable summary");
}

/// Per-method means. Rows of meshes without vertices carry no error and are left out.
pub fn compare_methods(rows: &[AggregateRow]) -> Vec<MethodComparison> {
    let mut acc: BTreeMap<NormalizationType, (usize, f64, f64)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.n_vertices > 0) {
        let e = acc.entry(row.method).or_default();
        e.0 += 1;
        e.1 += row.mse;
        e.2 += row.mae;
    }
    acc.into_iter()
        .map(|(method, (runs, mse, mae))| MethodComparison {
            method,
            runs,
            mean_mse: mse / runs as f64,
            mean_mae: mae / runs as f64,
        })
        .collect()
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}

pub fn write_rows_csv<W: Write>(writer: &mut W, rows: &[AggregateRow]) -> io::Result<()> {
    writeln!(writer, "group,mesh,method,n_vertices,bins,mse,mae,mse_x,mse_y,mse_z,mae_x,mae_y,mae_z")?;
    for r in rows {
        writeln!(
            writer,
            "{},{},{},{},{},{:e},{:e},{:e},{:e},{:e},{:e},{:e},{:e}",
            csv_field(&r.group), csv_field(&r.mesh), r.method, r.n_vertices, r.bins,
            r.mse, r.mae,
            r.mse_per_axis[0], r.mse_per_axis[1], r.mse_per_axis[2],
            r.mae_per_axis[0], r.mae_per_axis[1], r.mae_per_axis[2],
        )?;
    }
    Ok(())
}

pub fn write_comparison_csv<W: Write>(writer: &mut W, methods: &[MethodComparison]) -> io::Result<()> {
    writeln!(writer, "method,runs,mean_mse,mean_mae")?;
    for m in methods {
        writeln!(writer, "{},{},{:e},{:e}", m.method, m.runs, m.mean_mse, m.mean_mae)?;
    }
    Ok(())
}

fn write_file<F>(path: &Path, f: F) -> Result<(), Err>
    where F: FnOnce(&mut BufWriter<File>) -> io::Result<()>
{
    let mut file = BufWriter::new(File::create(path).map_err(io_err(path))?);
    f(&mut file).map_err(io_err(path))?;
    file.flush().map_err(io_err(path))
}

/// Collects every summary under `outputs_dir` and writes the aggregate table, the
/// per-method comparison and a small json report into `out_dir`.
pub fn aggregate<P, Q>(outputs_dir: P, out_dir: Q) -> Result<AggregateReport, Err>
    where P: AsRef<Path>, Q: AsRef<Path>,
{
    let outputs_dir = outputs_dir.as_ref();
    let out_dir = out_dir.as_ref();
    let (rows, skipped) = collect_rows(outputs_dir)?;
    if rows.is_empty() && skipped == 0 {
        return Err(Err::NoSummaries(outputs_dir.display().to_string()));
    }
    fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;

    let methods = compare_methods(&rows);
    write_file(&out_dir.join(AGGREGATE_CSV), |w| write_rows_csv(w, &rows))?;
    write_file(&out_dir.join(COMPARISON_CSV), |w| write_comparison_csv(w, &methods))?;

    let report = AggregateReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        outputs_dir: outputs_dir.display().to_string(),
        rows: rows.len(),
        skipped,
        methods,
    };
    write_file(&out_dir.join(REPORT_JSON), |w| {
        serde_json::to_writer_pretty(&mut *w, &report).map_err(io::Error::from)
    })?;
    tracing::info!(rows = report.rows, skipped, out_dir = %out_dir.display(), "aggregate written");
    Ok(report)
}
