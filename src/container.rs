use crate::config::RecordPolicy;
use crate::error::{ConvertError, Result};
use apache_avro::types::Value;
use apache_avro::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub const TIMEZONE_FIELD: &str = "timezone";
pub const EDA_FIELD: &str = "rawData.eda";
pub const BVP_FIELD: &str = "rawData.bvp";
pub const TAGS_FIELD: &str = "rawData.tags.tagsTimeMicros";

/// One decoded recording, kept as the dynamic value tree of its embedded
/// schema so that field lookups fail with the dotted path that was missing.
#[derive(Debug, Clone)]
pub struct Recording {
    datum: Value,
}

/// A uniformly sampled sensor stream (`eda`, `bvp`).
#[derive(Debug, Clone, PartialEq)]
pub struct SampledStream {
    pub name: String,
    pub sampling_frequency: f64,
    pub timestamp_start: i64,
    pub values: Vec<f64>,
}

/// Open `path` and decode the single recording it holds.
pub fn read_container(path: &Path, policy: RecordPolicy) -> Result<Recording> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    decode_container(BufReader::new(file), path, policy)
}

/// Decode a container from any reader. `source` only labels errors.
pub fn decode_container<R: Read>(
    input: R,
    source: &Path,
    policy: RecordPolicy,
) -> Result<Recording> {
    let reader = Reader::new(input).map_err(|e| ConvertError::malformed(source, e))?;
    tracing::debug!(schema = %reader.writer_schema().canonical_form(), "container schema");

    let mut last = None;
    let mut count = 0usize;
    for datum in reader {
        let datum = datum.map_err(|e| ConvertError::malformed(source, e))?;
        count += 1;
        if count > 1 && policy == RecordPolicy::ExactlyOne {
            return Err(ConvertError::malformed(source, "expected exactly one record, found more"));
        }
        last = Some(datum);
    }

    if count > 1 {
        tracing::warn!("{} holds {} records, keeping the last one", source.display(), count);
    }

    last.map(Recording::new)
        .ok_or_else(|| ConvertError::malformed(source, "container holds no records"))
}

impl Recording {
    pub fn new(datum: Value) -> Self {
        Recording { datum }
    }

    /// Resolve a dotted field path such as `rawData.eda.values`.
    pub fn field(&self, path: &str) -> Result<&Value> {
        let mut current = &self.datum;
        for (depth, name) in path.split('.').enumerate() {
            let fields = match unwrap_union(current) {
                Value::Record(fields) => fields,
                _ => {
                    let parent = match depth {
                        0 => "<root>".to_string(),
                        _ => path.split('.').take(depth).collect::<Vec<_>>().join("."),
                    };
                    return Err(ConvertError::FieldType { field: parent, expected: "a record" });
                }
            };
            current = fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| ConvertError::MissingField(path.to_string()))?;
        }
        Ok(unwrap_union(current))
    }

    /// Names of the fields of the record at `path`, in schema order.
    pub fn field_names(&self, path: &str) -> Result<Vec<&str>> {
        match self.field(path)? {
            Value::Record(fields) => Ok(fields.iter().map(|(n, _)| n.as_str()).collect()),
            _ => Err(ConvertError::FieldType { field: path.to_string(), expected: "a record" }),
        }
    }

    /// Offset from UTC in seconds.
    pub fn timezone_offset(&self) -> Result<i64> {
        as_integer(self.field(TIMEZONE_FIELD)?, TIMEZONE_FIELD)
    }

    pub fn manual_tag_times(&self) -> Result<Vec<i64>> {
        as_array(self.field(TAGS_FIELD)?, TAGS_FIELD)?
            .iter()
            .map(|v| as_integer(unwrap_union(v), TAGS_FIELD))
            .collect()
    }

    pub fn sampled_stream(&self, path: &str) -> Result<SampledStream> {
        let freq_path = format!("{path}.samplingFrequency");
        let start_path = format!("{path}.timestampStart");
        let values_path = format!("{path}.values");

        let sampling_frequency = as_number(self.field(&freq_path)?, &freq_path)?;
        let timestamp_start = as_integer(self.field(&start_path)?, &start_path)?;
        let values = as_array(self.field(&values_path)?, &values_path)?
            .iter()
            .map(|v| as_number(unwrap_union(v), &values_path))
            .collect::<Result<Vec<f64>>>()?;

        Ok(SampledStream {
            name: path.to_string(),
            sampling_frequency,
            timestamp_start,
            values,
        })
    }
}

fn unwrap_union(value: &Value) -> &Value {
    match value {
        Value::Union(_, inner) => unwrap_union(inner),
        other => other,
    }
}

fn as_integer(value: &Value, field: &str) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(i64::from(*v)),
        Value::Long(v) | Value::TimestampMillis(v) | Value::TimestampMicros(v) => Ok(*v),
        _ => Err(ConvertError::FieldType { field: field.to_string(), expected: "an integer" }),
    }
}

fn as_number(value: &Value, field: &str) -> Result<f64> {
    match value {
        Value::Float(v) => Ok(f64::from(*v)),
        Value::Double(v) => Ok(*v),
        Value::Int(v) => Ok(f64::from(*v)),
        Value::Long(v) => Ok(*v as f64),
        _ => Err(ConvertError::FieldType { field: field.to_string(), expected: "a number" }),
    }
}

fn as_array<'a>(value: &'a Value, field: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ConvertError::FieldType { field: field.to_string(), expected: "an array" }),
    }
}
