use crate::model::ReportDataStream;

/// Upper bound on the name part of an archive entry, in characters.
pub const MAX_NAME_LENGTH: usize = 16;

const UNSUPPORTED_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Strip characters that common filesystems and archive readers reject.
pub fn remove_unsupported_chars(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !UNSUPPORTED_CHARS.contains(c))
        .collect()
}

pub fn truncate(name: &str, max_chars: usize) -> &str {
    match name.char_indices().nth(max_chars) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Filename-safe, length-bounded form of a display name. `None` yields an empty string.
pub fn sanitize_file_name(name: Option<&str>) -> String {
    match name {
        Some(name) => truncate(&remove_unsupported_chars(name), MAX_NAME_LENGTH).to_string(),
        None => String::new(),
    }
}

/// Entry name of the merged strategy.
pub fn report_file_name(report_name: &str) -> String {
    let name = sanitize_file_name(Some(report_name));
    if name.is_empty() {
        "report.csv".to_string()
    } else {
        format!("{}.csv", name)
    }
}

pub fn device_file_name(device_name: &str, device_id: i32) -> String {
    if device_name.is_empty() {
        format!("{}.csv", device_id)
    } else {
        format!("{}_{}.csv", device_name, device_id)
    }
}

pub fn device_and_pin_file_name(
    device_name: &str,
    device_id: i32,
    stream: &ReportDataStream,
) -> String {
    let pin = format!("{}{}", stream.pin_type.code(), stream.pin);
    if device_name.is_empty() {
        format!("{}_{}.csv", device_id, pin)
    } else {
        format!("{}_{}_{}.csv", device_name, device_id, pin)
    }
}
