//! Stream extractors: pure transforms from a decoded recording (or its
//! file name) to the rows of one exported table.
//!
//! EDA and BVP timestamps are rebuilt from each stream's start and
//! sampling frequency, but with different units. EDA treats
//! `timestampStart` as seconds and yields seconds; BVP divides
//! `timestampStart` by 1000 and adds milliseconds. Existing exports depend on
//! both formulas, so they are kept exactly as they are.

use crate::container::{Recording, SampledStream, BVP_FIELD, EDA_FIELD};
use crate::error::{ConvertError, Result};
use crate::table::{Cell, Table, TableKind};
use std::path::Path;

/// Recording start in milliseconds, from the trailing `_<seconds>` of the
/// file stem: `.../session_1700000000.avro` -> `1700000000000`.
pub fn filename_timestamp(path: &Path) -> Result<Table> {
    let invalid = || ConvertError::FilenameTimestamp { path: path.to_path_buf() };

    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let (_, segment) = stem.rsplit_once('_').ok_or_else(invalid)?;
    let seconds: i64 = segment.trim().parse().map_err(|_| invalid())?;
    let millis = seconds.checked_mul(1000).ok_or_else(invalid)?;

    Ok(Table::new(TableKind::StartTimestamp, vec![vec![Cell::Int(millis)]]))
}

pub fn manual_tags(recording: &Recording) -> Result<Table> {
    let rows = recording
        .manual_tag_times()?
        .into_iter()
        .map(|t| vec![Cell::Int(t)])
        .collect();
    Ok(Table::new(TableKind::ManualTags, rows))
}

pub fn eda(recording: &Recording) -> Result<Table> {
    let stream = recording.sampled_stream(EDA_FIELD)?;
    check_frequency(&stream)?;
    Ok(Table::new(TableKind::Eda, sample_rows(&stream, eda_timestamp)))
}

pub fn cardiac(recording: &Recording) -> Result<Table> {
    let fields = recording.field_names(BVP_FIELD)?;
    tracing::info!("cardiac fields: {}", fields.join(", "));

    let stream = recording.sampled_stream(BVP_FIELD)?;
    check_frequency(&stream)?;
    Ok(Table::new(TableKind::Bvp, sample_rows(&stream, cardiac_timestamp)))
}

/// Seconds: `i / fs + start`.
pub fn eda_timestamp(index: usize, stream: &SampledStream) -> f64 {
    (index as f64 / stream.sampling_frequency) + stream.timestamp_start as f64
}

/// Milliseconds: `(i / fs) * 1000 + start / 1000`.
pub fn cardiac_timestamp(index: usize, stream: &SampledStream) -> f64 {
    (index as f64 / stream.sampling_frequency * 1000.0) + (stream.timestamp_start as f64 / 1000.0)
}

fn sample_rows(
    stream: &SampledStream,
    timestamp: fn(usize, &SampledStream) -> f64,
) -> Vec<Vec<Cell>> {
    stream
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| vec![Cell::Float(timestamp(i, stream)), Cell::Float(*v)])
        .collect()
}

fn check_frequency(stream: &SampledStream) -> Result<()> {
    let fs = stream.sampling_frequency;
    if !stream.values.is_empty() && !(fs.is_finite() && fs > 0.0) {
        return Err(ConvertError::InvalidSamplingFrequency {
            stream: stream.name.clone(),
            frequency: fs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::fixtures::*;
    use apache_avro::types::Value;

    fn decoded(spec: &RecordingSpec) -> Recording {
        Recording::new(recording_value(spec))
    }

    fn floats(table: &Table, column: usize) -> Vec<f64> {
        table
            .rows
            .iter()
            .map(|row| match row[column] {
                Cell::Float(v) => v,
                Cell::Int(v) => v as f64,
            })
            .collect()
    }

    #[test]
    fn test_filename_timestamp() -> anyhow::Result<()> {
        let table = filename_timestamp(Path::new("/data/p01/session_1700000000.avro"))?;
        assert_eq!(table.kind, TableKind::StartTimestamp);
        assert_eq!(table.rows, vec![vec![Cell::Int(1_700_000_000_000)]]);

        let table = filename_timestamp(Path::new("1-1-01_2_1700003600.avro"))?;
        assert_eq!(table.rows, vec![vec![Cell::Int(1_700_003_600_000)]]);
        Ok(())
    }

    #[test]
    fn test_filename_timestamp_rejects_bad_names() {
        for name in [
            "/data/session.avro",
            "/data/session_abc.avro",
            "/data/session_.avro",
            "/data_1700000000/session.avro",
            "/data/session_99999999999999999.avro",
        ] {
            assert!(
                matches!(
                    filename_timestamp(Path::new(name)),
                    Err(ConvertError::FilenameTimestamp { .. })
                ),
                "{name} accepted"
            );
        }
    }

    #[test]
    fn test_manual_tags_keep_order() -> anyhow::Result<()> {
        let spec = RecordingSpec::default();
        let table = manual_tags(&decoded(&spec))?;
        assert_eq!(table.kind, TableKind::ManualTags);
        let got: Vec<Cell> = table.rows.into_iter().map(|r| r[0]).collect();
        let want: Vec<Cell> = spec.tags.iter().map(|t| Cell::Int(*t)).collect();
        assert_eq!(got, want);
        Ok(())
    }

    #[test]
    fn test_manual_tags_empty() -> anyhow::Result<()> {
        let spec = RecordingSpec { tags: vec![], ..RecordingSpec::default() };
        assert!(manual_tags(&decoded(&spec))?.rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_eda_rows() -> anyhow::Result<()> {
        let spec = RecordingSpec::default();
        let table = eda(&decoded(&spec))?;
        assert_eq!(table.kind, TableKind::Eda);
        assert_eq!(table.rows.len(), spec.eda.values.len());
        assert_eq!(
            floats(&table, 0),
            vec![
                1700000000.0,
                1700000000.25,
                1700000000.5,
                1700000000.75,
                1700000001.0,
                1700000001.25,
            ]
        );
        let want: Vec<f64> = spec.eda.values.iter().map(|v| f64::from(*v)).collect();
        assert_eq!(floats(&table, 1), want);
        Ok(())
    }

    #[test]
    fn test_cardiac_formula() -> anyhow::Result<()> {
        let spec = RecordingSpec::default();
        let table = cardiac(&decoded(&spec))?;
        assert_eq!(table.kind, TableKind::Bvp);
        assert_eq!(table.rows.len(), 130);

        let ts = floats(&table, 0);
        assert_eq!(ts[0], 1700000000.0);
        assert_eq!(ts[64], 1700000000.0 + 1000.0);
        assert_eq!(ts[1], 1700000015.625);
        Ok(())
    }

    #[test]
    fn test_eda_and_cardiac_units_differ() {
        let stream = SampledStream {
            name: "s".to_string(),
            sampling_frequency: 2.0,
            timestamp_start: 1000,
            values: vec![0.0; 3],
        };
        assert_eq!(eda_timestamp(1, &stream), 1000.5);
        assert_eq!(cardiac_timestamp(1, &stream), 501.0);
    }

    #[test]
    fn test_timestamps_strictly_increase() -> anyhow::Result<()> {
        let recording = decoded(&RecordingSpec::default());
        for table in [eda(&recording)?, cardiac(&recording)?] {
            let ts = floats(&table, 0);
            assert!(ts.windows(2).all(|w| w[0] < w[1]), "{:?} not increasing", table.kind);
        }
        Ok(())
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let mut spec = RecordingSpec::default();
        spec.eda.sampling_frequency = 0.0;
        match eda(&decoded(&spec)) {
            Err(ConvertError::InvalidSamplingFrequency { stream, frequency }) => {
                assert_eq!(stream, EDA_FIELD);
                assert_eq!(frequency, 0.0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_frequency_allowed_without_samples() -> anyhow::Result<()> {
        let mut spec = RecordingSpec::default();
        spec.bvp.sampling_frequency = 0.0;
        spec.bvp.values.clear();
        assert!(cardiac(&decoded(&spec))?.rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_tags_field() {
        let recording = Recording::new(Value::Record(vec![(
            "rawData".to_string(),
            Value::Record(vec![]),
        )]));
        match manual_tags(&recording) {
            Err(ConvertError::MissingField(field)) => {
                assert_eq!(field, "rawData.tags.tagsTimeMicros")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
