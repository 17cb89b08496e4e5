// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR extraction result and the lenient parser for collaborator responses.
//
// The OCR collaborator answers with free text that usually contains a JSON
// object (often inside a ```json fence). Parsing never fails: anything that
// cannot be read becomes `None`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fenced json pattern"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("date pattern"));
static AMOUNT_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""amount"\s*:\s*(\d+)"#).expect("amount pattern"));
static PAYEE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""payee"\s*:\s*"([^"]+)""#).expect("payee pattern"));

/// Fields read off a receipt or invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrExtraction {
    /// Transaction date (serialised as ISO-8601 `YYYY-MM-DD`).
    pub date: Option<NaiveDate>,
    /// Total amount in the smallest currency unit shown on the document.
    pub amount: Option<i64>,
    /// Shop or company name.
    pub payee: Option<String>,
    /// The collaborator's unparsed response, kept for auditing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl OcrExtraction {
    /// Nothing extracted. What callers get when OCR fails outright.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.amount.is_none() && self.payee.is_none()
    }

    /// Parse a collaborator response.
    ///
    /// Uses the first ```json fenced block when present, otherwise the whole
    /// text. When the JSON is unreadable, falls back to scanning the text for
    /// a `YYYY-MM-DD` date, an `"amount": N` pair, and a `"payee": "..."` pair.
    pub fn parse_response(response: &str) -> Self {
        let body = fenced_json(response).unwrap_or(response).trim();
        let mut parsed = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Self {
                date: map.get("date").and_then(parse_date_value),
                amount: map.get("amount").and_then(parse_amount_value),
                payee: map.get("payee").and_then(parse_payee_value),
                raw_text: None,
            },
            Ok(other) => {
                warn!(kind = json_kind(&other), "OCR response is not a JSON object");
                Self::fallback(response)
            }
            Err(err) => {
                warn!(error = %err, "OCR response is not valid JSON; scanning text");
                Self::fallback(response)
            }
        };
        parsed.raw_text = Some(response.to_owned());
        debug!(
            date = ?parsed.date,
            amount = ?parsed.amount,
            payee = ?parsed.payee,
            "OCR response parsed"
        );
        parsed
    }

    fn fallback(text: &str) -> Self {
        Self {
            date: find_iso_date(text),
            amount: capture_group(&AMOUNT_PAIR, text)
                .and_then(|digits| digits.parse::<i64>().ok())
                .filter(|n| *n > 0),
            payee: capture_group(&PAYEE_PAIR, text)
                .map(str::trim)
                .filter(|payee| !payee.is_empty())
                .map(str::to_owned),
            raw_text: None,
        }
    }
}

/// Contents of the first ```json ... ``` block.
fn fenced_json(text: &str) -> Option<&str> {
    capture_group(&FENCED_JSON, text)
}

fn capture_group<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    Some(pattern.captures(text)?.get(1)?.as_str())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        return None;
    }
    let parsed = parse_date(text);
    if parsed.is_none() {
        warn!(date = text, "unrecognised date format");
    }
    parsed
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Positive integer amounts only; zero or negative totals are treated as unread.
fn parse_amount_value(value: &Value) -> Option<i64> {
    let amount = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
                .filter(|c| *c != ',')
                .collect();
            let integer_part = digits.split('.').next().unwrap_or("");
            integer_part.parse::<i64>().ok()
        }
        _ => None,
    }?;
    (amount > 0).then_some(amount)
}

fn parse_payee_value(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text.to_owned())
    }
}

/// First `YYYY-MM-DD` substring that is a real calendar date.
fn find_iso_date(text: &str) -> Option<NaiveDate> {
    ISO_DATE
        .find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}
