/// Append-only CSV session log.
///
/// The header row is written exactly once, at creation. Every append is
/// open-write-flush-close within a single tick — no persistent handle, and
/// each batch of rows goes out in one `write_all`, so a failed tick never
/// leaves a partial row behind.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{FixedOffset, SecondsFormat, Utc};

use crate::error::Error;
use crate::session::SessionRecord;

/// Fixed column order; `csv_row` must match.
const HEADER: &str = "timestamp,user,device,title,transcode_video,transcode_audio,\
                      decision,video_resolution,video_codec,audio_codec,bitrate_kbps,reasons";

/// Log timestamps carry a fixed UTC+11 offset (operator locale).
const LOG_UTC_OFFSET_SECS: i32 = 11 * 3600;

/// Create the log with its header row if absent. Idempotent — a no-op when
/// the file already exists.
pub fn ensure_log(path: &Path) -> Result<(), Error> {
    if path.exists() {
        return Ok(());
    }
    let mut f = std::fs::File::create(path)?;
    writeln!(f, "{HEADER}")?;
    f.flush()?;
    Ok(())
}

/// Append one row per record, all stamped with the same write-time
/// timestamp, and flush before returning so a crash after return cannot
/// lose an already-acknowledged append.
pub fn append(path: &Path, records: &[SessionRecord], timestamp: &str) -> Result<(), Error> {
    let mut chunk = String::new();
    for rec in records {
        chunk.push_str(&csv_row(timestamp, rec));
        chunk.push('\n');
    }
    let mut f = OpenOptions::new().append(true).open(path)?;
    f.write_all(chunk.as_bytes())?;
    f.flush()?;
    Ok(())
}

/// Current timestamp at the fixed log offset, RFC 3339.
pub fn now_stamp() -> String {
    // 11 hours is always within FixedOffset's valid range.
    let offset = FixedOffset::east_opt(LOG_UTC_OFFSET_SECS).unwrap();
    Utc::now()
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// One data row in header order. Booleans render as `true`/`false`, an
/// unknown bitrate as an empty field.
fn csv_row(timestamp: &str, rec: &SessionRecord) -> String {
    let bitrate = match rec.bitrate_kbps {
        Some(kbps) => kbps.to_string(),
        None => String::new(),
    };
    let fields = [
        timestamp,
        rec.user.as_str(),
        rec.device.as_str(),
        rec.title.as_str(),
        if rec.transcode_video { "true" } else { "false" },
        if rec.transcode_audio { "true" } else { "false" },
        rec.decision.as_str(),
        rec.video_resolution.as_str(),
        rec.video_codec.as_str(),
        rec.audio_codec.as_str(),
        bitrate.as_str(),
        rec.reasons.as_str(),
    ];
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field containing a delimiter, quote or line break, doubling
/// inner quotes (RFC 4180).
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
