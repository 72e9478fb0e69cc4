//! Response Formatters

use crate::QueryError;
use chrono::DateTime;
use sensor_protocol::{Kind, Reading};
use serde::Serialize;
use std::fmt::Write;

/// Renders an ordered reading sequence into a response body
pub trait ResponseFormatter: Send + Sync {
    /// Value of the `Content-Type` header
    fn content_type(&self) -> &'static str;

    /// Render readings of `kind`, preserving their order
    fn render(&self, kind: Kind, readings: &[Reading]) -> Result<String, QueryError>;
}

#[derive(Serialize)]
struct Row {
    time: i64,
    value: i64,
}

/// JSON array of `{"time": .., "value": ..}` objects
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl ResponseFormatter for JsonFormatter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, _kind: Kind, readings: &[Reading]) -> Result<String, QueryError> {
        let rows: Vec<Row> = readings
            .iter()
            .map(|r| Row {
                time: r.time,
                value: r.value,
            })
            .collect();
        Ok(serde_json::to_string(&rows)?)
    }
}

/// HTML table with a UTC timestamp column
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormatter;

impl HtmlFormatter {
    fn timestamp(time: i64) -> String {
        DateTime::from_timestamp(time, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| time.to_string())
    }

    fn title(kind: Kind) -> &'static str {
        match kind {
            Kind::Temperature => "Temperature",
            Kind::Humidity => "Humidity",
        }
    }
}

impl ResponseFormatter for HtmlFormatter {
    fn content_type(&self) -> &'static str {
        "text/html"
    }

    fn render(&self, kind: Kind, readings: &[Reading]) -> Result<String, QueryError> {
        let title = Self::title(kind);
        let mut html = String::with_capacity(128 + readings.len() * 48);
        // Writing to a String cannot fail
        let _ = write!(
            html,
            "<!DOCTYPE html><html><head><title>{title}</title></head><body>\
             <h1>{title}</h1><table><tr><th>Time</th><th>Value</th></tr>"
        );
        for reading in readings {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                Self::timestamp(reading.time),
                reading.value
            );
        }
        html.push_str("</table></body></html>");
        Ok(html)
    }
}
