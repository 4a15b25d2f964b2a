use crate::error::Error;
use crate::model::Report;
use crate::sample::SampleBuffer;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

/// How timestamps and values of a report are rendered.
#[derive(Debug, Clone)]
pub struct ReportFormat {
    ts_pattern: Option<String>,
    tz: Tz,
    value_precision: Option<usize>,
}

impl ReportFormat {
    pub fn new(
        ts_pattern: Option<&str>,
        tz: Tz,
        value_precision: Option<usize>,
    ) -> Result<Self, Error> {
        let ts_pattern = match ts_pattern {
            None | Some("") | Some("ts") => None,
            Some(pattern) => {
                if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                    return Err(Error::InvalidFormat(pattern.to_string()));
                }
                // Some specifiers only parse; rendering them fails.
                render(DateTime::<Utc>::default(), pattern, tz)?;
                Some(pattern.to_string())
            }
        };
        Ok(Self {
            ts_pattern,
            tz,
            value_precision,
        })
    }

    pub fn for_report(report: &Report) -> Result<Self, Error> {
        Self::new(report.ts_format.as_deref(), report.tz, report.value_precision)
    }

    pub fn timestamp(&self, ts: i64) -> Result<String, Error> {
        match (&self.ts_pattern, DateTime::from_timestamp_millis(ts)) {
            (Some(pattern), Some(dt)) => render(dt, pattern, self.tz),
            _ => Ok(ts.to_string()),
        }
    }

    pub fn value(&self, value: f64) -> String {
        match self.value_precision {
            Some(precision) => format!("{:.*}", precision, value),
            None => value.to_string(),
        }
    }
}

fn render(dt: DateTime<Utc>, pattern: &str, tz: Tz) -> Result<String, Error> {
    let mut out = String::new();
    write!(out, "{}", dt.with_timezone(&tz).format(pattern))
        .map_err(|_| Error::InvalidFormat(pattern.to_string()))?;
    Ok(out)
}

/// Column layout of the rows written for one sample buffer.
#[derive(Debug, Clone, Copy)]
pub enum RowShape<'a> {
    /// `pin,device,ts,value`: the output mixes devices and pins.
    Labeled { pin: &'a str, device: &'a str },
    /// `pin,ts,value`: the output belongs to one device.
    DeviceScoped { pin: &'a str },
    /// `ts,value`: the output belongs to one device and one pin.
    PinScoped,
}

/// Rows rendered from one sample buffer.
#[derive(Debug, Default)]
pub struct CsvChunk {
    pub text: String,
    pub rows: usize,
}

impl CsvChunk {
    pub fn has_rows(&self) -> bool {
        self.rows > 0
    }
}

pub struct RowFormatter<'a> {
    start_from: i64,
    format: &'a ReportFormat,
}

impl<'a> RowFormatter<'a> {
    pub fn new(start_from: i64, format: &'a ReportFormat) -> Self {
        Self { start_from, format }
    }

    /// Render every sample at or after `start_from` as one newline-terminated row.
    pub fn rows(&self, buffer: &SampleBuffer, shape: RowShape<'_>) -> Result<CsvChunk, Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        let mut rows = 0;

        for sample in buffer.iter().filter(|s| s.ts >= self.start_from) {
            let ts = self.format.timestamp(sample.ts)?;
            let value = self.format.value(sample.value);
            match shape {
                RowShape::Labeled { pin, device } => {
                    writer.write_record([pin, device, ts.as_str(), value.as_str()])?
                }
                RowShape::DeviceScoped { pin } => {
                    writer.write_record([pin, ts.as_str(), value.as_str()])?
                }
                RowShape::PinScoped => writer.write_record([ts.as_str(), value.as_str()])?,
            }
            rows += 1;
        }

        let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        let text = String::from_utf8(bytes).map_err(|e| Error::Other(e.to_string()))?;
        Ok(CsvChunk { text, rows })
    }

    /// Whole-entry text for a single (device, pin) pair, `None` when no row survives the filter.
    pub fn pin_blob(&self, buffer: &SampleBuffer) -> Result<Option<String>, Error> {
        let chunk = self.rows(buffer, RowShape::PinScoped)?;
        Ok(chunk.has_rows().then_some(chunk.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    fn buffer_of(points: &[(i64, f64)]) -> SampleBuffer {
        SampleBuffer::new(points.iter().map(|&(ts, value)| Sample { ts, value }).collect())
    }

    fn millis_format() -> ReportFormat {
        ReportFormat::new(None, Tz::UTC, None).unwrap()
    }

    #[test]
    fn test_filters_samples_before_start() {
        let format = millis_format();
        let formatter = RowFormatter::new(150, &format);
        let chunk = formatter
            .rows(
                &buffer_of(&[(100, 1.0), (150, 1.5), (300, 3.0)]),
                RowShape::PinScoped,
            )
            .unwrap();
        assert_eq!(chunk.rows, 2);
        assert_eq!(chunk.text, "150,1.5\n300,3\n");
    }

    #[test]
    fn test_labeled_rows_escape_device_name() {
        let format = millis_format();
        let formatter = RowFormatter::new(0, &format);
        let chunk = formatter
            .rows(
                &buffer_of(&[(10, 2.25)]),
                RowShape::Labeled {
                    pin: "v1",
                    device: "Pump, \"east\"",
                },
            )
            .unwrap();
        assert_eq!(chunk.text, "v1,\"Pump, \"\"east\"\"\",10,2.25\n");
    }

    #[test]
    fn test_device_scoped_rows() {
        let format = millis_format();
        let formatter = RowFormatter::new(0, &format);
        let chunk = formatter
            .rows(&buffer_of(&[(10, 1.0), (20, 0.5)]), RowShape::DeviceScoped { pin: "d2" })
            .unwrap();
        assert_eq!(chunk.text, "d2,10,1\nd2,20,0.5\n");
    }

    #[test]
    fn test_pin_blob_is_none_without_rows() {
        let format = millis_format();
        let formatter = RowFormatter::new(1_000, &format);
        assert!(formatter.pin_blob(&buffer_of(&[(10, 1.0)])).unwrap().is_none());
        assert!(formatter.pin_blob(&SampleBuffer::default()).unwrap().is_none());
    }

    #[test]
    fn test_pattern_rendered_in_report_time_zone() {
        let format = ReportFormat::new(
            Some("%Y-%m-%d %H:%M"),
            chrono_tz::Europe::Helsinki,
            Some(2),
        )
        .unwrap();
        // 2024-01-15T10:00:00Z is 12:00 in Helsinki (UTC+2 in winter).
        assert_eq!(format.timestamp(1_705_312_800_000).unwrap(), "2024-01-15 12:00");
        assert_eq!(format.value(3.14159), "3.14");
    }

    #[test]
    fn test_ts_keyword_means_epoch_millis() {
        let format = ReportFormat::new(Some("ts"), Tz::UTC, None).unwrap();
        assert_eq!(format.timestamp(1_705_312_800_000).unwrap(), "1705312800000");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ReportFormat::new(Some("%!"), Tz::UTC, None).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_only_pattern_rejected() {
        let err = ReportFormat::new(Some("%Y %#z"), Tz::UTC, None).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(p) if p == "%Y %#z"));
    }

    #[test]
    fn test_rows_parse_back_to_fields() {
        let format = millis_format();
        let formatter = RowFormatter::new(0, &format);
        let chunk = formatter
            .rows(
                &buffer_of(&[(5, -1.5), (6, 42.0)]),
                RowShape::Labeled {
                    pin: "Temp; \"out\"",
                    device: "A,B",
                },
            )
            .unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(chunk.text.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Temp; \"out\"");
        assert_eq!(&records[0][1], "A,B");
        assert_eq!(&records[0][2], "5");
        assert_eq!(records[1][3].parse::<f64>().unwrap(), 42.0);
    }
}
