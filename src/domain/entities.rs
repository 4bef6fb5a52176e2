//! Domain Entities - Core telemetry objects
//!
//! A [`MetricRecord`] is one observation produced by a parser. The point
//! buffer turns it into a [`Point`], which knows how to render itself as a
//! single InfluxDB line protocol entry.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Tag appended to every point, carrying the collecting machine's name.
pub const HOST_TAG: &str = "host";

/// One observation of a metric family.
///
/// Records are built fully populated by a parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Metric family, used as the line protocol measurement
    pub measurement: String,
    /// Identifying labels, rendered as tags
    pub labels: BTreeMap<String, String>,
    /// Numeric values, rendered as fields
    pub values: BTreeMap<String, f64>,
    /// Capture instant
    pub timestamp: DateTime<Utc>,
}

impl MetricRecord {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            labels: BTreeMap::new(),
            values: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// A buffered, host-tagged record awaiting delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    /// Flattened and escaped `key=value` pairs, always ending with `host=...`
    pub tags: String,
    pub values: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Build a point from a record, flattening its labels and appending the host tag.
    ///
    /// Labels named `host` are dropped so the injected tag stays unique, and
    /// labels with empty values are skipped since line protocol rejects them.
    pub fn from_record(record: MetricRecord, hostname: &str) -> Self {
        let mut tags = String::new();

        for (key, value) in &record.labels {
            if key == HOST_TAG || key.is_empty() || value.is_empty() {
                continue;
            }
            push_escaped(&mut tags, key, TAG_SPECIALS);
            tags.push('=');
            push_escaped(&mut tags, value, TAG_SPECIALS);
            tags.push(',');
        }

        tags.push_str(HOST_TAG);
        tags.push('=');
        push_escaped(&mut tags, hostname, TAG_SPECIALS);

        Self {
            measurement: record.measurement,
            tags,
            values: record.values,
            timestamp: record.timestamp,
        }
    }

    /// Nanoseconds since the Unix epoch.
    pub fn unix_nanos(&self) -> i128 {
        i128::from(self.timestamp.timestamp()) * 1_000_000_000
            + i128::from(self.timestamp.timestamp_subsec_nanos())
    }

    /// Append this point as one newline-terminated line protocol entry.
    pub fn write_line(&self, out: &mut String) {
        use fmt::Write;
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", self);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = String::with_capacity(128);
        push_escaped(&mut line, &self.measurement, MEASUREMENT_SPECIALS);
        if !self.tags.is_empty() {
            line.push(',');
            line.push_str(&self.tags);
        }
        line.push(' ');

        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            push_escaped(&mut line, key, TAG_SPECIALS);
            line.push('=');
            line.push_str(&format_float(*value));
        }

        write!(f, "{} {}", line, self.unix_nanos())
    }
}

const MEASUREMENT_SPECIALS: &[char] = &[',', ' '];
const TAG_SPECIALS: &[char] = &[',', '=', ' '];

fn push_escaped(out: &mut String, raw: &str, specials: &[char]) {
    for c in raw.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Render a float the way Go's `%g` verb does with the shortest precision:
/// plain decimal for exponents in `[-4, 6)`, otherwise `d.ddde±XX`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if (-4..6).contains(&exponent) {
        format!("{}", value)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}
