use crate::archive::{ArchiveAssembler, EntryStart};
use crate::csv_rows::{ReportFormat, RowFormatter, RowShape};
use crate::error::Error;
use crate::model::{Dashboard, Report, ReportDataStream, ReportOutput, ReportTaskKey};
use crate::naming;
use crate::sample::{SampleBuffer, SampleRequest, SampleSource};
use crate::window::ReportWindow;
use tracing::{debug, trace};

/// Archive layout of a report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingStrategy {
    /// One entry for the whole report, rows labeled with pin and device.
    Merged,
    /// One entry per device id.
    PerDevice,
    /// One entry per (device, pin) pair that produced rows.
    PerDevicePerPin,
}

impl From<ReportOutput> for PackagingStrategy {
    fn from(output: ReportOutput) -> Self {
        match output {
            ReportOutput::MergedCsv | ReportOutput::ExcelTabPerDevice => PackagingStrategy::Merged,
            ReportOutput::CsvFilePerDevice => PackagingStrategy::PerDevice,
            ReportOutput::CsvFilePerDevicePerPin | ReportOutput::Unknown => {
                PackagingStrategy::PerDevicePerPin
            }
        }
    }
}

/// Pulls pin data for one report and writes it into an archive.
pub struct ReportPackager<'a> {
    samples: &'a dyn SampleSource,
    key: &'a ReportTaskKey,
    dashboard: &'a Dashboard,
    report: &'a Report,
    window: ReportWindow,
    format: ReportFormat,
}

impl<'a> ReportPackager<'a> {
    pub fn new(
        samples: &'a dyn SampleSource,
        key: &'a ReportTaskKey,
        dashboard: &'a Dashboard,
        report: &'a Report,
        window: ReportWindow,
    ) -> Result<Self, Error> {
        Ok(Self {
            samples,
            key,
            dashboard,
            report,
            window,
            format: ReportFormat::for_report(report)?,
        })
    }

    pub fn strategy(&self) -> PackagingStrategy {
        PackagingStrategy::from(self.report.output)
    }

    /// Returns whether any entry received at least one data row.
    pub fn package(&self, archive: &mut ArchiveAssembler) -> Result<bool, Error> {
        let strategy = self.strategy();
        debug!("Packaging report {} as {:?}", self.report.id, strategy);
        match strategy {
            PackagingStrategy::Merged => self.merged(archive),
            PackagingStrategy::PerDevice => self.per_device(archive),
            PackagingStrategy::PerDevicePerPin => self.per_device_per_pin(archive),
        }
    }

    fn merged(&self, archive: &mut ArchiveAssembler) -> Result<bool, Error> {
        let mut has_data = false;
        let file_name = naming::report_file_name(self.report.display_name());
        if archive.begin_entry(&file_name)? == EntryStart::Duplicate {
            return Ok(false);
        }
        let formatter = self.formatter();

        for source in self.report.sources.iter().filter(|s| s.is_valid()) {
            for &device_id in &source.device_ids {
                let device_name = self.csv_device_name(device_id);
                for stream in source.valid_streams() {
                    let Some(buffer) = self.fetch(device_id, stream)? else {
                        continue;
                    };
                    let pin = stream.format_pin();
                    let chunk = formatter.rows(
                        &buffer,
                        RowShape::Labeled {
                            pin: &pin,
                            device: &device_name,
                        },
                    )?;
                    if chunk.has_rows() {
                        archive.write_text(&chunk.text)?;
                        has_data = true;
                    }
                }
            }
        }

        archive.end_entry()?;
        Ok(has_data)
    }

    fn per_device(&self, archive: &mut ArchiveAssembler) -> Result<bool, Error> {
        let mut has_data = false;
        let formatter = self.formatter();

        for source in self.report.sources.iter().filter(|s| s.is_valid()) {
            for &device_id in &source.device_ids {
                let file_name =
                    naming::device_file_name(&self.file_device_name(device_id), device_id);
                if archive.begin_entry(&file_name)? == EntryStart::Duplicate {
                    continue;
                }
                for stream in source.valid_streams() {
                    let Some(buffer) = self.fetch(device_id, stream)? else {
                        continue;
                    };
                    let pin = stream.format_pin();
                    let chunk = formatter.rows(&buffer, RowShape::DeviceScoped { pin: &pin })?;
                    if chunk.has_rows() {
                        archive.write_text(&chunk.text)?;
                        has_data = true;
                    }
                }
                archive.end_entry()?;
            }
        }

        Ok(has_data)
    }

    fn per_device_per_pin(&self, archive: &mut ArchiveAssembler) -> Result<bool, Error> {
        let mut has_data = false;
        let formatter = self.formatter();

        for source in self.report.sources.iter().filter(|s| s.is_valid()) {
            for &device_id in &source.device_ids {
                let device_name = self.file_device_name(device_id);
                for stream in source.valid_streams() {
                    let Some(buffer) = self.fetch(device_id, stream)? else {
                        continue;
                    };
                    let Some(text) = formatter.pin_blob(&buffer)? else {
                        continue;
                    };
                    let file_name =
                        naming::device_and_pin_file_name(&device_name, device_id, stream);
                    if archive.write_whole_entry(&file_name, &text)? == EntryStart::Started {
                        has_data = true;
                    }
                }
            }
        }

        Ok(has_data)
    }

    fn formatter(&self) -> RowFormatter<'_> {
        RowFormatter::new(self.window.start_from, &self.format)
    }

    /// Absent and empty buffers both mean "no data".
    fn fetch(
        &self,
        device_id: i32,
        stream: &ReportDataStream,
    ) -> Result<Option<SampleBuffer>, Error> {
        let request = SampleRequest {
            key: self.key,
            device_id,
            pin_type: stream.pin_type,
            pin: stream.pin,
            max_count: self.window.fetch_count,
            granularity: self.report.granularity,
            offset: 0,
        };
        let buffer = self.samples.fetch(&request)?.filter(|b| !b.is_empty());
        if buffer.is_none() {
            trace!(
                "No data for device {} pin {}{}",
                device_id,
                stream.pin_type.code(),
                stream.pin
            );
        }
        Ok(buffer)
    }

    /// Device column of merged rows: the full display name, else the device id.
    fn csv_device_name(&self, device_id: i32) -> String {
        match self.dashboard.device_name(device_id) {
            Some(name) => name.to_string(),
            None => device_id.to_string(),
        }
    }

    fn file_device_name(&self, device_id: i32) -> String {
        naming::sanitize_file_name(self.dashboard.device(device_id).and_then(|d| d.name.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_mapping() {
        assert_eq!(PackagingStrategy::from(ReportOutput::MergedCsv), PackagingStrategy::Merged);
        assert_eq!(
            PackagingStrategy::from(ReportOutput::ExcelTabPerDevice),
            PackagingStrategy::Merged
        );
        assert_eq!(
            PackagingStrategy::from(ReportOutput::CsvFilePerDevice),
            PackagingStrategy::PerDevice
        );
        assert_eq!(
            PackagingStrategy::from(ReportOutput::CsvFilePerDevicePerPin),
            PackagingStrategy::PerDevicePerPin
        );
        assert_eq!(
            PackagingStrategy::from(ReportOutput::Unknown),
            PackagingStrategy::PerDevicePerPin
        );
    }
}
