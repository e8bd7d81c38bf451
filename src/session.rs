/// Session record extraction: flattens the Plex `/status/sessions`
/// document into fixed-schema records.
///
/// Plex reports the same fact in different places depending on whether a
/// session is direct-played or transcoded, so every field is an ordered
/// fallback chain over optional sub-objects (`Player`, `User`,
/// `TranscodeSession`, `Media[0]`, `Media[0].Part[0]`, ...). A chain
/// short-circuits on the first non-empty value; exhausting it yields the
/// field's placeholder, never a missing field.

use serde_json::Value;

use crate::error::Error;

/// Placeholder for an unknown user, device or title.
const UNKNOWN: &str = "Unknown";

/// One flattened playback session.
///
/// Every field is always populated — unknown data is a placeholder value,
/// so downstream serialization never has to handle absence.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub user: String,
    pub device: String,
    pub title: String,
    pub transcode_video: bool,
    pub transcode_audio: bool,
    /// Lowercased; normally `directplay`, `directstream`, `transcode` or
    /// `unknown`.
    pub decision: String,
    /// `"<width>x<height>"`, each axis independently `"?"` when unknown.
    pub video_resolution: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub bitrate_kbps: Option<i64>,
    pub reasons: String,
}

/// Extract one record per session entry, preserving document order.
///
/// Tolerates any missing, null, or oddly-typed sub-field. The only hard
/// error is a document whose top level is not a JSON object.
pub fn extract(doc: &Value) -> Result<Vec<SessionRecord>, Error> {
    if !doc.is_object() {
        return Err(Error::Shape("top-level response is not a JSON object"));
    }
    let metadata = doc.get("MediaContainer").and_then(|c| c.get("Metadata"));
    Ok(normalize_entries(metadata).into_iter().map(extract_entry).collect())
}

/// Normalize `Metadata` to a list of entries. Plex serializes a single
/// active session as a bare object rather than a one-element array.
fn normalize_entries(metadata: Option<&Value>) -> Vec<&Value> {
    match metadata {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(entry @ Value::Object(_)) => vec![entry],
        _ => Vec::new(),
    }
}

fn extract_entry(entry: &Value) -> SessionRecord {
    let transcode = entry.get("TranscodeSession");
    let media = entry.get("Media").and_then(|m| m.get(0));
    let part = media.and_then(|m| m.get("Part")).and_then(|p| p.get(0));
    let stream = part.and_then(|p| p.get("Stream")).and_then(|s| s.get(0));

    let user = text(entry.get("User"), "title").unwrap_or_else(|| UNKNOWN.into());

    let device = text(entry.get("Player"), "title")
        .or_else(|| text(entry.get("Player"), "product"))
        .unwrap_or_else(|| UNKNOWN.into());

    // For episodic content the show title (grandparent) reads better than
    // the episode's own title when the latter is absent.
    let title = text(Some(entry), "title")
        .or_else(|| text(Some(entry), "grandparentTitle"))
        .unwrap_or_else(|| UNKNOWN.into());

    // Direct-play sessions carry the decision on the Part; an active
    // transcode carries it on the TranscodeSession.
    let decision = text(part, "Decision")
        .or_else(|| text(transcode, "videoDecision"))
        .map(|d| d.to_lowercase())
        .unwrap_or_else(|| "unknown".into());

    // Exact, case-sensitive compare against the raw fields — independent
    // of the lowercased `decision` above.
    let transcode_video =
        transcode.and_then(|t| t.get("videoDecision")).and_then(Value::as_str) == Some("transcode");
    let transcode_audio =
        transcode.and_then(|t| t.get("audioDecision")).and_then(Value::as_str) == Some("transcode");

    // Each axis falls back independently, so partial info survives as
    // e.g. "1920x?" instead of collapsing to "?x?".
    let video_resolution = format!(
        "{}x{}",
        text(media, "width").unwrap_or_else(|| "?".into()),
        text(media, "height").unwrap_or_else(|| "?".into()),
    );

    let video_codec = text(media, "videoCodec").unwrap_or_else(|| "?".into());

    // Simple sessions report the audio codec at the Media level; complex
    // multi-stream sessions only on the first stream.
    let audio_codec = text(media, "audioCodec")
        .or_else(|| text(stream, "codec"))
        .unwrap_or_else(|| "?".into());

    // Media reports kbps directly; TranscodeSession reports bits/sec. A
    // present but unparseable Media value stays unknown — it does not fall
    // through to the TranscodeSession path.
    let bitrate_kbps = match media.and_then(|m| m.get("bitrate")).filter(|b| !b.is_null()) {
        Some(raw) => scalar_i64(raw),
        None => transcode
            .and_then(|t| t.get("bitrate"))
            .and_then(scalar_i64)
            .map(|bits| bits / 1000),
    };

    // Note the lowercase `decision` on the Part here — a different field
    // than the `Decision` consumed above.
    let reasons = text(transcode, "transcodeHwRequestedReason")
        .or_else(|| text(transcode, "transcodeHwDecoding"))
        .or_else(|| text(part, "decision"))
        .unwrap_or_default();

    SessionRecord {
        user,
        device,
        title,
        transcode_video,
        transcode_audio,
        decision,
        video_resolution,
        video_codec,
        audio_codec,
        bitrate_kbps,
        reasons,
    }
}

/// Look up `key` on an optional object and render the value as text.
fn text(obj: Option<&Value>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key)).and_then(scalar_string)
}

/// Render a JSON string or number as text. Empty strings and non-scalar
/// values count as absent so fallback chains keep going.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON number or numeric string as an integer. Anything else —
/// including numeric garbage like `"fast"` — is `None`, never a panic.
fn scalar_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(metadata: Value) -> Value {
        json!({ "MediaContainer": { "Metadata": metadata } })
    }

    #[test]
    fn empty_entry_gets_placeholders_everywhere() {
        let records = extract(&doc(json!([{}]))).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.user, "Unknown");
        assert_eq!(r.device, "Unknown");
        assert_eq!(r.title, "Unknown");
        assert!(!r.transcode_video);
        assert!(!r.transcode_audio);
        assert_eq!(r.decision, "unknown");
        assert_eq!(r.video_resolution, "?x?");
        assert_eq!(r.video_codec, "?");
        assert_eq!(r.audio_codec, "?");
        assert_eq!(r.bitrate_kbps, None);
        assert_eq!(r.reasons, "");
    }

    #[test]
    fn video_transcode_without_audio_decision() {
        let records = extract(&doc(json!([{
            "TranscodeSession": { "videoDecision": "transcode" }
        }])))
        .unwrap();
        assert!(records[0].transcode_video);
        assert!(!records[0].transcode_audio);
    }

    #[test]
    fn transcode_flags_are_case_sensitive() {
        let records = extract(&doc(json!([{
            "TranscodeSession": { "videoDecision": "Transcode", "audioDecision": "copy" }
        }])))
        .unwrap();
        assert!(!records[0].transcode_video);
        assert!(!records[0].transcode_audio);
        // The decision string still gets the lowercased value.
        assert_eq!(records[0].decision, "transcode");
    }

    #[test]
    fn partial_resolution_is_preserved() {
        let records = extract(&doc(json!([{ "Media": [{ "width": 1920 }] }]))).unwrap();
        assert_eq!(records[0].video_resolution, "1920x?");

        let records = extract(&doc(json!([{ "Media": [{ "height": "1080" }] }]))).unwrap();
        assert_eq!(records[0].video_resolution, "?x1080");
    }

    #[test]
    fn transcode_bitrate_string_converts_to_kbps() {
        let records = extract(&doc(json!([{
            "TranscodeSession": { "bitrate": "4500000" }
        }])))
        .unwrap();
        assert_eq!(records[0].bitrate_kbps, Some(4500));
    }

    #[test]
    fn media_bitrate_wins_and_is_not_divided() {
        let records = extract(&doc(json!([{
            "Media": [{ "bitrate": 8000 }],
            "TranscodeSession": { "bitrate": 4500000 }
        }])))
        .unwrap();
        assert_eq!(records[0].bitrate_kbps, Some(8000));
    }

    #[test]
    fn garbage_bitrate_is_unknown_without_fallthrough() {
        // A present but unparseable Media bitrate must not fall through to
        // the TranscodeSession value (which has different units).
        let records = extract(&doc(json!([{
            "Media": [{ "bitrate": "fast" }],
            "TranscodeSession": { "bitrate": 4500000 }
        }])))
        .unwrap();
        assert_eq!(records[0].bitrate_kbps, None);

        let records = extract(&doc(json!([{
            "TranscodeSession": { "bitrate": "garbage" }
        }])))
        .unwrap();
        assert_eq!(records[0].bitrate_kbps, None);
    }

    #[test]
    fn null_media_bitrate_falls_through() {
        let records = extract(&doc(json!([{
            "Media": [{ "bitrate": null }],
            "TranscodeSession": { "bitrate": 2000000 }
        }])))
        .unwrap();
        assert_eq!(records[0].bitrate_kbps, Some(2000));
    }

    #[test]
    fn decision_prefers_part_over_transcode_session() {
        let records = extract(&doc(json!([{
            "Media": [{ "Part": [{ "Decision": "directplay" }] }],
            "TranscodeSession": { "videoDecision": "transcode" }
        }])))
        .unwrap();
        assert_eq!(records[0].decision, "directplay");
    }

    #[test]
    fn decision_is_lowercased() {
        let records = extract(&doc(json!([{
            "Media": [{ "Part": [{ "Decision": "DirectPlay" }] }]
        }])))
        .unwrap();
        assert_eq!(records[0].decision, "directplay");
    }

    #[test]
    fn no_decision_anywhere_means_unknown() {
        let records = extract(&doc(json!([{
            "Media": [{ "Part": [{}] }],
            "TranscodeSession": {}
        }])))
        .unwrap();
        assert_eq!(records[0].decision, "unknown");
    }

    #[test]
    fn single_object_metadata_matches_one_element_list() {
        let as_object = extract(&doc(json!({ "title": "Heat" }))).unwrap();
        let as_list = extract(&doc(json!([{ "title": "Heat" }]))).unwrap();
        assert_eq!(as_object.len(), 1);
        assert_eq!(as_object, as_list);
    }

    #[test]
    fn absent_or_empty_metadata_yields_no_records() {
        assert!(extract(&json!({})).unwrap().is_empty());
        assert!(extract(&json!({ "MediaContainer": {} })).unwrap().is_empty());
        assert!(extract(&doc(json!([]))).unwrap().is_empty());
        assert!(extract(&doc(json!(null))).unwrap().is_empty());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(matches!(extract(&json!([1, 2, 3])), Err(Error::Shape(_))));
        assert!(matches!(extract(&json!("sessions")), Err(Error::Shape(_))));
    }

    #[test]
    fn entry_order_is_preserved() {
        let records = extract(&doc(json!([
            { "title": "first" },
            { "title": "second" },
            { "title": "third" }
        ])))
        .unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn audio_codec_falls_back_to_first_stream() {
        let records = extract(&doc(json!([{
            "Media": [{ "Part": [{ "Stream": [{ "codec": "eac3" }] }] }]
        }])))
        .unwrap();
        assert_eq!(records[0].audio_codec, "eac3");

        let records = extract(&doc(json!([{
            "Media": [{ "audioCodec": "aac", "Part": [{ "Stream": [{ "codec": "eac3" }] }] }]
        }])))
        .unwrap();
        assert_eq!(records[0].audio_codec, "aac");
    }

    #[test]
    fn grandparent_title_covers_episodes() {
        let records = extract(&doc(json!([{ "grandparentTitle": "The Wire" }]))).unwrap();
        assert_eq!(records[0].title, "The Wire");

        // An empty own title falls through as well.
        let records =
            extract(&doc(json!([{ "title": "", "grandparentTitle": "The Wire" }]))).unwrap();
        assert_eq!(records[0].title, "The Wire");
    }

    #[test]
    fn device_falls_back_to_product() {
        let records = extract(&doc(json!([{ "Player": { "product": "Plex Web" } }]))).unwrap();
        assert_eq!(records[0].device, "Plex Web");
    }

    #[test]
    fn reasons_fallback_chain() {
        let records = extract(&doc(json!([{
            "TranscodeSession": {
                "transcodeHwRequestedReason": "hw policy",
                "transcodeHwDecoding": "vaapi"
            }
        }])))
        .unwrap();
        assert_eq!(records[0].reasons, "hw policy");

        let records = extract(&doc(json!([{
            "TranscodeSession": { "transcodeHwDecoding": "vaapi" }
        }])))
        .unwrap();
        assert_eq!(records[0].reasons, "vaapi");

        let records = extract(&doc(json!([{
            "Media": [{ "Part": [{ "decision": "directplay" }] }]
        }])))
        .unwrap();
        assert_eq!(records[0].reasons, "directplay");
    }

    #[test]
    fn realistic_transcoding_session() {
        // Shape taken from a live `/status/sessions` response for an
        // actively transcoding TV episode.
        let records = extract(&doc(json!([{
            "title": "Episode 3",
            "grandparentTitle": "Some Show",
            "User": { "id": "1", "title": "alice" },
            "Player": { "title": "Living Room TV", "product": "Plex for LG" },
            "Media": [{
                "width": 1920,
                "height": 1080,
                "videoCodec": "h264",
                "bitrate": 10409,
                "Part": [{
                    "decision": "transcode",
                    "Stream": [{ "codec": "eac3" }]
                }]
            }],
            "TranscodeSession": {
                "videoDecision": "transcode",
                "audioDecision": "copy",
                "bitrate": 4000000,
                "transcodeHwRequestedReason": "fallback"
            }
        }])))
        .unwrap();

        let r = &records[0];
        assert_eq!(r.user, "alice");
        assert_eq!(r.device, "Living Room TV");
        assert_eq!(r.title, "Episode 3");
        assert!(r.transcode_video);
        assert!(!r.transcode_audio);
        assert_eq!(r.decision, "transcode");
        assert_eq!(r.video_resolution, "1920x1080");
        assert_eq!(r.video_codec, "h264");
        assert_eq!(r.audio_codec, "eac3");
        assert_eq!(r.bitrate_kbps, Some(10409));
        assert_eq!(r.reasons, "fallback");
    }
}
