use serde::de::DeserializeOwned;
use serde::Serialize;

/// Terminator the daemon prints after every stored record.
const RECORD_END: &[u8] = b"\" },";
/// Separator between a record's source address and its payload.
const PAYLOAD_START: &[u8] = b"\", \"";
/// Every payload we emit is JSON or an RFC 3339 timestamp; both contain a
/// colon. Pieces without one are framing artifacts.
const CONTENT_MARKER: u8 = b':';

/// Encode a value into its opaque wire form.
pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Serialization of our own types cannot fail; fall back to an empty
    // payload rather than poisoning a broadcast task.
    serde_json::to_vec(value).unwrap_or_default()
}

/// Decode a daemon response into zero or more values.
///
/// The daemon returns all records for a channel concatenated in its storage
/// framing, with payload bytes escaped twice. Corrupt records are dropped
/// individually; total garbage decodes to an empty vec, never an error.
pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> Vec<T> {
    let unescaped = unescape(&unescape(blob));
    split_records(&unescaped)
        .into_iter()
        .filter(|record| record.contains(&CONTENT_MARKER))
        .map(payload_of)
        .filter_map(|payload| serde_json::from_slice(payload).ok())
        .collect()
}

/// Split a response on the daemon's record terminator.
fn split_records(data: &[u8]) -> Vec<&[u8]> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + RECORD_END.len() <= data.len() {
        if &data[i..i + RECORD_END.len()] == RECORD_END {
            records.push(&data[start..i]);
            i += RECORD_END.len();
            start = i;
        } else {
            i += 1;
        }
    }
    if start < data.len() {
        records.push(&data[start..]);
    }
    records
}

/// Strip the `{ "<source address>", "` preamble from a record, leaving the
/// payload bytes. A record with no preamble (a bare encoded value) is taken
/// as payload whole; framing artifacts fail deserialization and drop out.
fn payload_of(record: &[u8]) -> &[u8] {
    let at = record
        .windows(PAYLOAD_START.len())
        .position(|window| window == PAYLOAD_START);
    match at {
        Some(at) => trim_ascii(&record[at + PAYLOAD_START.len()..]),
        None => trim_ascii(record),
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Reverse one layer of the daemon's backslash escaping: `\xNN` hex escapes,
/// doubled backslashes, and the common control escapes. Unrecognized escape
/// sequences pass through untouched so JSON string escapes survive.
fn unescape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] != b'\\' || i + 1 >= data.len() {
            out.push(data[i]);
            i += 1;
            continue;
        }
        match data[i + 1] {
            b'x' if i + 3 < data.len() => match hex_byte(data[i + 2], data[i + 3]) {
                Some(byte) => {
                    out.push(byte);
                    i += 4;
                }
                None => {
                    out.push(data[i]);
                    i += 1;
                }
            },
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'n' => {
                out.push(b'\n');
                i += 2;
            }
            b't' => {
                out.push(b'\t');
                i += 2;
            }
            b'r' => {
                out.push(b'\r');
                i += 2;
            }
            b'0' => {
                out.push(0);
                i += 2;
            }
            _ => {
                out.push(data[i]);
                i += 1;
            }
        }
    }
    out
}

fn hex_byte(high: u8, low: u8) -> Option<u8> {
    let high = (high as char).to_digit(16)?;
    let low = (low as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

/// Apply one layer of the daemon's escaping. Only the test daemon uses this
/// to frame stored payloads the way the real daemon prints them.
pub(crate) fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x20..=0x7e => out.push(byte),
            _ => out.extend_from_slice(format!("\\x{:02x}", byte).as_bytes()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Report {
        cue_number: String,
        node_state: String,
    }

    fn frame(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            out.extend_from_slice(format!("{{ \"02:ba:7c:00:00:{:02x}\", \"", i).as_bytes());
            out.extend_from_slice(&escape(&escape(payload)));
            out.extend_from_slice(b"\" },\n");
        }
        out
    }

    #[test]
    fn test_bare_round_trip_without_framing() {
        let report = Report {
            cue_number: "F1".to_string(),
            node_state: "Waiting".to_string(),
        };
        let decoded: Vec<Report> = decode(&encode(&report));
        assert_eq!(decoded, vec![report]);
    }

    #[test]
    fn test_round_trip_single_record() {
        let report = Report {
            cue_number: "SL1".to_string(),
            node_state: "Ready".to_string(),
        };
        let blob = frame(&[&encode(&report)]);
        let decoded: Vec<Report> = decode(&blob);
        assert_eq!(decoded, vec![report]);
    }

    #[test]
    fn test_round_trip_timestamp_scalar() {
        let stamp = Utc.with_ymd_and_hms(2024, 5, 17, 20, 30, 0).unwrap();
        let blob = frame(&[&encode(&stamp)]);
        let decoded: Vec<chrono::DateTime<Utc>> = decode(&blob);
        assert_eq!(decoded, vec![stamp]);
    }

    #[test]
    fn test_corrupt_record_is_dropped_not_fatal() {
        let good = Report {
            cue_number: "SR2".to_string(),
            node_state: "Fired".to_string(),
        };
        let blob = frame(&[b"{not json at all:", &encode(&good), b"\x80\x05garbage:"]);
        let decoded: Vec<Report> = decode(&blob);
        assert_eq!(decoded, vec![good]);
    }

    #[test]
    fn test_garbage_decodes_to_empty() {
        let decoded: Vec<Report> = decode(b"\x00\xff\xfenothing here");
        assert!(decoded.is_empty());
        let decoded: Vec<Report> = decode(b"");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_multiple_records_preserve_order() {
        let reports: Vec<Report> = (0..3)
            .map(|i| Report {
                cue_number: format!("SL{}", i),
                node_state: "Standby".to_string(),
            })
            .collect();
        let payloads: Vec<Vec<u8>> = reports.iter().map(encode).collect();
        let refs: Vec<&[u8]> = payloads.iter().map(Vec::as_slice).collect();
        let decoded: Vec<Report> = decode(&frame(&refs));
        assert_eq!(decoded, reports);
    }

    #[test]
    fn test_payload_with_embedded_quotes_survives() {
        let report = Report {
            cue_number: "SL1".to_string(),
            node_state: "say \"go\", then wait".to_string(),
        };
        let blob = frame(&[&encode(&report)]);
        let decoded: Vec<Report> = decode(&blob);
        assert_eq!(decoded, vec![report]);
    }
}
