use crate::error::Error;
use crate::model::{Granularity, PinType, ReportTaskKey};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Size of one stored record: `f64` value followed by `i64` timestamp, big-endian.
pub const RECORD_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ts: i64,
    pub value: f64,
}

/// Ordered samples of one (device, pin) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Decode stored records. A trailing partial record is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let chunks = bytes.chunks_exact(RECORD_SIZE);
        if !chunks.remainder().is_empty() {
            debug!(
                "Ignoring {} trailing bytes of a partial sample record",
                chunks.remainder().len()
            );
        }
        let samples = chunks
            .map(|record| {
                let mut value = [0u8; 8];
                let mut ts = [0u8; 8];
                value.copy_from_slice(&record[..8]);
                ts.copy_from_slice(&record[8..]);
                Sample {
                    value: f64::from_be_bytes(value),
                    ts: i64::from_be_bytes(ts),
                }
            })
            .collect();
        Self { samples }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * RECORD_SIZE);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.value.to_be_bytes());
            bytes.extend_from_slice(&sample.ts.to_be_bytes());
        }
        bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One storage query: a (device, pin) pair over the run's window.
#[derive(Debug, Clone, Copy)]
pub struct SampleRequest<'a> {
    pub key: &'a ReportTaskKey,
    pub device_id: i32,
    pub pin_type: PinType,
    pub pin: u8,
    pub max_count: usize,
    pub granularity: Granularity,
    pub offset: usize,
}

/// Time-series storage the packager pulls pin data from.
///
/// The store bounds the upper edge of the window; only the lower edge is
/// filtered while formatting rows. `Ok(None)` means no data for the pair.
pub trait SampleSource: Send + Sync {
    fn fetch(&self, request: &SampleRequest<'_>) -> Result<Option<SampleBuffer>, Error>;
}

/// Reads the newest records of per-pin history files.
///
/// Layout: `<root>/<email>_<app>/history_<dash>-<device>_<code><pin>_<granularity>.bin`
pub struct DiskSampleSource {
    root: PathBuf,
}

impl DiskSampleSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn user_dir(&self, key: &ReportTaskKey) -> PathBuf {
        self.root.join(format!("{}_{}", key.email, key.app_name))
    }

    pub fn history_path(&self, request: &SampleRequest<'_>) -> PathBuf {
        self.user_dir(request.key).join(history_file_name(
            request.key.dash_id,
            request.device_id,
            request.pin_type,
            request.pin,
            request.granularity,
        ))
    }
}

pub fn history_file_name(
    dash_id: i32,
    device_id: i32,
    pin_type: PinType,
    pin: u8,
    granularity: Granularity,
) -> String {
    format!(
        "history_{}-{}_{}{}_{}.bin",
        dash_id,
        device_id,
        pin_type.code(),
        pin,
        granularity.label()
    )
}

impl SampleSource for DiskSampleSource {
    fn fetch(&self, request: &SampleRequest<'_>) -> Result<Option<SampleBuffer>, Error> {
        let path = self.history_path(request);
        match read_newest_records(&path, request.max_count, request.offset) {
            Ok(bytes) => {
                let buffer = SampleBuffer::from_bytes(&bytes);
                trace!("Read {} samples from {}", buffer.len(), path.display());
                Ok(Some(buffer))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!("No history file {}", path.display());
                Ok(None)
            }
            Err(err) => Err(io::Error::new(
                err.kind(),
                format!("Error reading {}: {}", path.display(), err),
            )
            .into()),
        }
    }
}

/// Read up to `count` records ending `offset` records before the end of the file.
fn read_newest_records(path: &Path, count: usize, offset: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let total_records = file.metadata()?.len() / RECORD_SIZE as u64;
    let end = total_records.saturating_sub(offset as u64);
    let start = end.saturating_sub(count as u64);

    let mut bytes = vec![0u8; ((end - start) as usize) * RECORD_SIZE];
    file.seek(SeekFrom::Start(start * RECORD_SIZE as u64))?;
    file.read_exact(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn key() -> ReportTaskKey {
        ReportTaskKey {
            email: "ops@example.com".to_string(),
            app_name: "Blynk".to_string(),
            dash_id: 4,
            report_id: 1,
        }
    }

    fn request(key: &ReportTaskKey, max_count: usize, offset: usize) -> SampleRequest<'_> {
        SampleRequest {
            key,
            device_id: 7,
            pin_type: PinType::Virtual,
            pin: 3,
            max_count,
            granularity: Granularity::Minute,
            offset,
        }
    }

    fn buffer_of(points: &[(i64, f64)]) -> SampleBuffer {
        SampleBuffer::new(points.iter().map(|&(ts, value)| Sample { ts, value }).collect())
    }

    #[test]
    fn test_decodes_big_endian_records() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&21.5f64.to_be_bytes());
        bytes.extend_from_slice(&1_000i64.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        let buffer = SampleBuffer::from_bytes(&bytes);
        assert_eq!(buffer.len(), 1);
        assert_eq!(
            buffer.iter().next(),
            Some(&Sample {
                ts: 1_000,
                value: 21.5
            })
        );
    }

    #[test]
    fn test_missing_history_file_is_absent() {
        let tmp = tempdir().unwrap();
        let source = DiskSampleSource::new(tmp.path());
        let key = key();
        assert!(source.fetch(&request(&key, 10, 0)).unwrap().is_none());
    }

    #[test]
    fn test_reads_newest_records_with_offset() {
        let tmp = tempdir().unwrap();
        let source = DiskSampleSource::new(tmp.path());
        let key = key();
        let req = request(&key, 2, 1);

        let path = source.history_path(&req);
        assert!(path.ends_with("ops@example.com_Blynk/history_4-7_v3_minute.bin"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let stored = buffer_of(&[(100, 1.0), (200, 2.0), (300, 3.0), (400, 4.0)]);
        fs::write(&path, stored.to_bytes()).unwrap();

        let fetched = source.fetch(&req).unwrap().unwrap();
        assert_eq!(fetched, buffer_of(&[(200, 2.0), (300, 3.0)]));

        let everything = source.fetch(&request(&key, 100, 0)).unwrap().unwrap();
        assert_eq!(everything, stored);

        let past_start = source.fetch(&request(&key, 10, 10)).unwrap().unwrap();
        assert!(past_start.is_empty());
    }
}
