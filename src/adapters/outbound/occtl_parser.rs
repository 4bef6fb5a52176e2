//! occtl Session Parser
//!
//! Implements MetricsParser for the JSON output of `occtl -j show users`.
//! Each connected user becomes one `openconnect` record.

use crate::domain::entities::MetricRecord;
use crate::domain::errors::ParseError;
use crate::domain::ports::MetricsParser;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Measurement name for VPN session records.
pub const MEASUREMENT: &str = "openconnect";

/// Username occtl reports while a session is still being established.
pub const NO_SESSION_USERNAME: &str = "(none)";

/// Layout of the `Connected at` column.
const CONNECTED_AT_LAYOUT: &str = "%Y-%m-%d %H:%M";

/// A counter cell; occtl emits most of them as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Cell {
    Number(f64),
    Text(String),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Text(String::new())
    }
}

/// One row of `occtl -j show users`. Columns we don't use are ignored.
#[derive(Debug, Deserialize)]
struct Session {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Remote IP", default)]
    remote_ip: String,
    #[serde(rename = "RX", default)]
    rx: Cell,
    #[serde(rename = "TX", default)]
    tx: Cell,
    #[serde(rename = "Average RX", default)]
    average_rx: String,
    #[serde(rename = "Average TX", default)]
    average_tx: String,
    #[serde(rename = "Connected at", default)]
    connected_at: String,
}

/// Parser for occtl user listings.
#[derive(Debug, Clone, Default)]
pub struct OcctlParser;

impl OcctlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a snapshot taken at `now`.
    ///
    /// Sessions without a username yet are skipped. Any malformed counter,
    /// rate or timestamp fails the whole snapshot.
    pub fn parse_at(&self, raw: &[u8], now: DateTime<Utc>) -> Result<Vec<MetricRecord>, ParseError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let sessions: Vec<Session> = serde_json::from_slice(raw)?;
        let total = sessions.len();
        let mut records = Vec::with_capacity(total);

        for session in sessions {
            if session.username == NO_SESSION_USERNAME {
                continue;
            }
            records.push(Self::to_record(session, now)?);
        }

        tracing::debug!(
            "parsed {} sessions ({} still connecting)",
            records.len(),
            total - records.len()
        );

        Ok(records)
    }

    fn to_record(session: Session, now: DateTime<Utc>) -> Result<MetricRecord, ParseError> {
        let received = parse_counter("RX", &session.rx)?;
        let transmitted = parse_counter("TX", &session.tx)?;
        let avg_received = parse_rate("Average RX", &session.average_rx)?;
        let avg_transmitted = parse_rate("Average TX", &session.average_tx)?;
        let connected_at = parse_connected_at(&session.connected_at)?;
        let age = (now - connected_at).num_milliseconds() as f64 / 1000.0;

        let username = required_label("Username", session.username)?;
        let state = required_label("State", session.state)?;
        let remote_ip = required_label("Remote IP", session.remote_ip)?;

        Ok(MetricRecord::new(MEASUREMENT, now)
            .with_label("username", username)
            .with_label("state", state)
            .with_label("remote_ip", remote_ip)
            .with_value("received_bytes", received)
            .with_value("transmitted_bytes", transmitted)
            .with_value("avg_received_bytespersec", avg_received)
            .with_value("avg_transmitted_bytespersec", avg_transmitted)
            .with_value("connection_age", age))
    }
}

impl MetricsParser for OcctlParser {
    fn parse(&self, raw: &[u8]) -> Result<Vec<MetricRecord>, ParseError> {
        self.parse_at(raw, Utc::now())
    }
}

/// Identifying columns must be present and non-blank.
fn required_label(field: &'static str, value: String) -> Result<String, ParseError> {
    if value.trim().is_empty() {
        return Err(ParseError::Missing { field });
    }
    Ok(value)
}

fn parse_counter(field: &'static str, cell: &Cell) -> Result<f64, ParseError> {
    match cell {
        Cell::Number(n) => Ok(*n),
        Cell::Text(s) => s.trim().parse().map_err(|_| ParseError::Number {
            field,
            value: s.clone(),
        }),
    }
}

/// Parse a human readable rate such as `"1.5 KB/sec"` or `"512 bytes/sec"`
/// into bytes per second. Units are decimal multiples of 1000.
fn parse_rate(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::Rate {
        field,
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let rate = trimmed
        .strip_suffix("/sec")
        .or_else(|| trimmed.strip_suffix("/s"))
        .unwrap_or(trimmed)
        .trim_end();

    let split = rate
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(rate.len());
    let (number, unit) = rate.split_at(split);

    let number: f64 = number.trim().parse().map_err(|_| invalid())?;
    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => 1.0,
        "kb" => 1e3,
        "mb" => 1e6,
        "gb" => 1e9,
        "tb" => 1e12,
        _ => return Err(invalid()),
    };

    Ok(number * scale)
}

fn parse_connected_at(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), CONNECTED_AT_LAYOUT)
        .map(|t| t.and_utc())
        .map_err(|source| ParseError::Timestamp {
            field: "Connected at",
            value: raw.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn session(username: &str, rx: &str) -> serde_json::Value {
        serde_json::json!({
            "ID": 42,
            "Username": username,
            "Groupname": "(none)",
            "State": "connected",
            "Remote IP": "198.51.100.4",
            "RX": rx,
            "TX": "2048",
            "Average RX": "1.5 KB/sec",
            "Average TX": "512 bytes/sec",
            "Connected at": "2024-05-01 11:58",
            "DNS": ["10.0.0.1"]
        })
    }

    fn snapshot(entries: Vec<serde_json::Value>) -> Vec<u8> {
        serde_json::to_vec(&entries).unwrap()
    }

    #[test]
    fn test_parse_single_session() {
        let raw = snapshot(vec![session("alice", "1024")]);
        let records = OcctlParser::new().parse_at(&raw, now()).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.measurement, "openconnect");
        assert_eq!(r.timestamp, now());
        assert_eq!(r.labels["username"], "alice");
        assert_eq!(r.labels["state"], "connected");
        assert_eq!(r.labels["remote_ip"], "198.51.100.4");
        assert_eq!(r.values["received_bytes"], 1024.0);
        assert_eq!(r.values["transmitted_bytes"], 2048.0);
        assert_eq!(r.values["avg_received_bytespersec"], 1500.0);
        assert_eq!(r.values["avg_transmitted_bytespersec"], 512.0);
        assert_eq!(r.values["connection_age"], 120.0);
    }

    #[test]
    fn test_parse_keeps_snapshot_order() {
        let raw = snapshot(vec![session("alice", "1"), session("bob", "2")]);
        let records = OcctlParser::new().parse_at(&raw, now()).unwrap();
        let users: Vec<_> = records.iter().map(|r| r.labels["username"].as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_skips_sessions_without_user() {
        let raw = snapshot(vec![session("(none)", "1"), session("bob", "2")]);
        let records = OcctlParser::new().parse_at(&raw, now()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].labels["username"], "bob");
    }

    #[test]
    fn test_parse_skipped_session_is_not_validated() {
        let raw = snapshot(vec![session("(none)", "garbage")]);
        let records = OcctlParser::new().parse_at(&raw, now()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_bad_counter_fails_whole_snapshot() {
        let raw = snapshot(vec![session("alice", "1024"), session("bob", "lots")]);
        let result = OcctlParser::new().parse_at(&raw, now());
        match result {
            Err(ParseError::Number { field, value }) => {
                assert_eq!(field, "RX");
                assert_eq!(value, "lots");
            }
            other => panic!("expected number error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bad_timestamp_fails() {
        let mut entry = session("alice", "1");
        entry["Connected at"] = "yesterday".into();
        let result = OcctlParser::new().parse_at(&snapshot(vec![entry]), now());
        assert!(matches!(result, Err(ParseError::Timestamp { .. })));
    }

    #[test]
    fn test_parse_bad_rate_fails() {
        let mut entry = session("alice", "1");
        entry["Average TX"] = "fast".into();
        let result = OcctlParser::new().parse_at(&snapshot(vec![entry]), now());
        assert!(matches!(
            result,
            Err(ParseError::Rate { field: "Average TX", .. })
        ));
    }

    #[test]
    fn test_parse_numeric_counters() {
        let mut entry = session("alice", "1");
        entry["RX"] = 4096.into();
        let records = OcctlParser::new()
            .parse_at(&snapshot(vec![entry]), now())
            .unwrap();
        assert_eq!(records[0].values["received_bytes"], 4096.0);
    }

    #[test]
    fn test_parse_missing_counter_fails() {
        let mut entry = session("alice", "1");
        entry.as_object_mut().unwrap().remove("TX");
        let result = OcctlParser::new().parse_at(&snapshot(vec![entry]), now());
        assert!(matches!(result, Err(ParseError::Number { field: "TX", .. })));
    }

    #[test]
    fn test_parse_session_without_identity_fails() {
        let raw = br#"[{"RX": "1", "TX": "2", "Average RX": "1 KB/sec",
            "Average TX": "1 KB/sec", "Connected at": "2024-05-01 11:58"}]"#;
        let result = OcctlParser::new().parse_at(raw, now());
        assert!(matches!(result, Err(ParseError::Missing { field: "Username" })));
    }

    #[test]
    fn test_parse_blank_label_fails_whole_snapshot() {
        let mut entry = session("bob", "2");
        entry.as_object_mut().unwrap().remove("State");
        let raw = snapshot(vec![session("alice", "1"), entry]);
        let result = OcctlParser::new().parse_at(&raw, now());
        assert!(matches!(result, Err(ParseError::Missing { field: "State" })));

        let mut entry = session("carol", "3");
        entry["Remote IP"] = " ".into();
        let result = OcctlParser::new().parse_at(&snapshot(vec![entry]), now());
        assert!(matches!(result, Err(ParseError::Missing { field: "Remote IP" })));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = OcctlParser::new().parse_at(b"not json", now());
        assert!(matches!(result, Err(ParseError::Json(_))));
    }

    #[test]
    fn test_parse_empty_output() {
        let parser = OcctlParser::new();
        assert!(parser.parse_at(b"", now()).unwrap().is_empty());
        assert!(parser.parse_at(b"  \n", now()).unwrap().is_empty());
        assert!(parser.parse_at(b"[]", now()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rate_units() {
        assert_eq!(parse_rate("r", "512 bytes/sec").unwrap(), 512.0);
        assert_eq!(parse_rate("r", "0 bytes/sec").unwrap(), 0.0);
        assert_eq!(parse_rate("r", "1.5 KB/sec").unwrap(), 1500.0);
        assert_eq!(parse_rate("r", "2.0 MB/sec").unwrap(), 2_000_000.0);
        assert_eq!(parse_rate("r", "1.0 GB/sec").unwrap(), 1e9);
        assert_eq!(parse_rate("r", "3KB/s").unwrap(), 3000.0);
        assert_eq!(parse_rate("r", "42").unwrap(), 42.0);
        assert!(parse_rate("r", "").is_err());
        assert!(parse_rate("r", "1.5 PB/sec").is_err());
    }

    #[test]
    fn test_parse_via_port_uses_wall_clock() {
        let raw = snapshot(vec![session("alice", "1")]);
        let before = Utc::now();
        let records = OcctlParser::new().parse(&raw).unwrap();
        assert!(records[0].timestamp >= before);
        assert!(records[0].values["connection_age"] > 0.0);
    }
}
