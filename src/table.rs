use crate::error::{ConvertError, Result};
use crate::utils::{format_float, output_path};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The four tables exported per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    StartTimestamp,
    ManualTags,
    Eda,
    Bvp,
}

impl TableKind {
    /// File-name suffix appended to the container's stem.
    pub fn suffix(self) -> &'static str {
        match self {
            TableKind::StartTimestamp => "timestampdeb",
            TableKind::ManualTags => "MANUALTAG",
            TableKind::Eda => "EDA",
            TableKind::Bvp => "BVP",
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            TableKind::StartTimestamp => &["timestamp_begin"],
            TableKind::ManualTags => &["manual_trigger_timestamp"],
            TableKind::Eda => &["eda_timestamp", "eda_values"],
            TableKind::Bvp => &["bvp_timestamp", "bvp_value"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub kind: TableKind,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(kind: TableKind, rows: Vec<Row>) -> Self {
        Table { kind, rows }
    }

    /// Header plus rows as CSV: `,` separated, `\n` terminated, quoted only
    /// where a field needs it.
    pub fn render(&self) -> std::result::Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(self.kind.header())?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// A table that reached its destination.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTable {
    pub kind: TableKind,
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
}

struct StagedTable {
    kind: TableKind,
    path: PathBuf,
    tmp_path: PathBuf,
    rows: usize,
    sha256: String,
}

/// Write every table derived from `input` next to it, or none of them.
///
/// All tables are rendered in memory first, then staged to `<output>.tmp`
/// files; the destinations are only replaced once every staged file is on
/// disk.
pub fn write_tables(input: &Path, tables: &[Table]) -> Result<Vec<WrittenTable>> {
    let mut rendered = Vec::with_capacity(tables.len());
    for table in tables {
        let path = output_path(input, table.kind.suffix());
        let bytes = table
            .render()
            .map_err(|e| ConvertError::io(&path, std::io::Error::from(e)))?;
        rendered.push((table, path, bytes));
    }

    let mut staged: Vec<StagedTable> = Vec::with_capacity(rendered.len());
    for (table, path, bytes) in rendered {
        let tmp_path = tmp_path_for(&path);
        if let Err(e) = stage(&tmp_path, &bytes) {
            discard(&staged);
            let _ = fs::remove_file(&tmp_path);
            return Err(ConvertError::io(&tmp_path, e));
        }
        staged.push(StagedTable {
            kind: table.kind,
            path,
            tmp_path,
            rows: table.rows.len(),
            sha256: format!("{:x}", Sha256::digest(&bytes)),
        });
    }

    let mut written = Vec::with_capacity(staged.len());
    for (idx, s) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(&s.tmp_path, &s.path) {
            discard(&staged[idx..]);
            return Err(ConvertError::io(&s.path, e));
        }
        tracing::debug!("wrote {} ({} rows)", s.path.display(), s.rows);
        written.push(WrittenTable {
            kind: s.kind,
            path: s.path.clone(),
            rows: s.rows,
            sha256: s.sha256.clone(),
        });
    }
    Ok(written)
}

/// Replace `path` with `bytes` through a synced temporary file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    if let Err(e) = stage(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(ConvertError::io(&tmp_path, e));
    }
    fs::rename(&tmp_path, path).map_err(|e| ConvertError::io(path, e))
}

fn stage(tmp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    let mut f = fs::File::create(tmp_path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

fn discard(staged: &[StagedTable]) {
    for s in staged {
        if let Err(e) = fs::remove_file(&s.tmp_path) {
            tracing::warn!("could not remove staged file {}: {}", s.tmp_path.display(), e);
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
