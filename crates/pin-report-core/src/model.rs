use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;

const DAY_MILLIS: i64 = 86_400_000;

/// Identity of one report run target. At most one run per key may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ReportTaskKey {
    pub email: String,
    pub app_name: String,
    pub dash_id: i32,
    pub report_id: i32,
}

impl fmt::Display for ReportTaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} dash {} report {}",
            self.email, self.app_name, self.dash_id, self.report_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    Digital,
    Analog,
    Virtual,
}

impl PinType {
    /// Single-character code used in pin labels and entry names.
    pub fn code(self) -> char {
        match self {
            PinType::Digital => 'd',
            PinType::Analog => 'a',
            PinType::Virtual => 'v',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Hourly,
    Daily,
}

impl Granularity {
    /// Sample period in milliseconds.
    pub fn period(self) -> i64 {
        match self {
            Granularity::Minute => 60_000,
            Granularity::Hourly => 3_600_000,
            Granularity::Daily => DAY_MILLIS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportType {
    OneTime { range_days: u32 },
    Daily,
    Weekly,
    Monthly,
}

impl ReportType {
    pub fn duration_days(&self) -> i64 {
        match self {
            ReportType::OneTime { range_days } => i64::from(*range_days),
            ReportType::Daily => 1,
            ReportType::Weekly => 7,
            ReportType::Monthly => 30,
        }
    }

    pub fn duration_millis(&self) -> i64 {
        self.duration_days() * DAY_MILLIS
    }

    pub fn duration_label(&self) -> &'static str {
        match self {
            ReportType::OneTime { .. } => "One time",
            ReportType::Daily => "Daily",
            ReportType::Weekly => "Weekly",
            ReportType::Monthly => "Monthly",
        }
    }

    /// Number of samples one pin can contribute over the report duration.
    pub fn fetch_count(&self, granularity: Granularity) -> usize {
        (self.duration_millis() / granularity.period()).max(0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutput {
    MergedCsv,
    CsvFilePerDevice,
    CsvFilePerDevicePerPin,
    /// Legacy value, packaged as merged CSV.
    ExcelTabPerDevice,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Ok,
    NoData,
    Error,
}

impl RunResult {
    pub fn as_str(self) -> &'static str {
        match self {
            RunResult::Ok => "OK",
            RunResult::NoData => "NO_DATA",
            RunResult::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(RunResult::Ok),
            "NO_DATA" => Some(RunResult::NoData),
            "ERROR" => Some(RunResult::Error),
            _ => None,
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion time and result of the latest run, applied as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRun {
    pub at: i64,
    pub result: RunResult,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportDataStream {
    pub pin_type: PinType,
    pub pin: u8,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

impl ReportDataStream {
    pub fn new(pin_type: PinType, pin: u8) -> Self {
        Self {
            pin_type,
            pin,
            label: None,
            enabled: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.enabled
    }

    /// Label used in the first CSV column: the configured label, else `<code><pin>`.
    pub fn format_pin(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("{}{}", self.pin_type.code(), self.pin),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSource {
    #[serde(default)]
    pub device_ids: Vec<i32>,
    #[serde(default)]
    pub data_streams: Vec<ReportDataStream>,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

impl ReportSource {
    pub fn is_valid(&self) -> bool {
        self.enabled && !self.device_ids.is_empty() && !self.data_streams.is_empty()
    }

    pub fn valid_streams(&self) -> impl Iterator<Item = &ReportDataStream> {
        self.data_streams.iter().filter(|s| s.is_valid())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dashboard {
    pub id: i32,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Dashboard {
    pub fn device(&self, device_id: i32) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    /// Non-empty display name of a device, if it has one.
    pub fn device_name(&self, device_id: i32) -> Option<&str> {
        self.device(device_id)
            .and_then(|d| d.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

fn default_tz() -> Tz {
    Tz::UTC
}

#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_tz")]
    pub tz: Tz,
    pub report_type: ReportType,
    pub granularity: Granularity,
    pub output: ReportOutput,
    #[serde(default)]
    pub sources: Vec<ReportSource>,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// `None` or `"ts"` renders epoch millis, anything else is a strftime pattern.
    #[serde(default)]
    pub ts_format: Option<String>,
    #[serde(default)]
    pub value_precision: Option<usize>,
    #[serde(skip)]
    pub last_run: Option<LastRun>,
}

impl Report {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Report"
        } else {
            &self.name
        }
    }

    pub fn apply_outcome(&mut self, last_run: LastRun) {
        self.last_run = Some(last_run);
    }

    /// Report-defined body section for the notification.
    pub fn dynamic_section(&self) -> String {
        format!(
            "Report name: {}<br>Period: {}<br>Granularity: {}<br>Time zone: {}<br>",
            self.display_name(),
            self.report_type.duration_label(),
            self.granularity.label(),
            self.tz.name(),
        )
    }
}

/// Everything one report run reads: who owns it, the dashboard devices and the report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportJob {
    pub key: ReportTaskKey,
    pub dashboard: Dashboard,
    pub report: Report,
}
