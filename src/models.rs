//! Core data models for the banking assistant

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// =============================
/// Turn & Conversation State
/// =============================

/// One user utterance plus the conversation state the client carried over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub context: Context,
}

/// Conversation state round-tripped between client and dialog engine.
///
/// Keys the orchestrator acts on are typed; everything else lands in
/// `extra` and is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub person: Option<Profile>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// Origin for a map-directions request.
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(
        rename = "getTransactions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub get_transactions: Option<Value>,

    #[serde(rename = "transNumber", default, skip_serializing_if = "Option::is_none")]
    pub trans_number: Option<Value>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<AccountView>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Context {
    /// `transNumber` as a row cap. Only positive JSON integers count.
    pub fn trans_number_cap(&self) -> Option<usize> {
        self.trans_number
            .as_ref()
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .map(|n| n as usize)
    }

    /// `getTransactions` compares loosely against 1 (`1`, `1.0`, `"1"`, `true`).
    pub fn wants_transactions(&self) -> bool {
        match &self.get_transactions {
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => s.trim() == "1",
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }
}

/// Lookup request placed in `context.action` by the dialog engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub lookup: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "strict_flag", skip_serializing_if = "Option::is_none")]
    pub append_response: Option<bool>,

    #[serde(default, deserialize_with = "strict_flag", skip_serializing_if = "Option::is_none")]
    pub append_total: Option<bool>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub startdt: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub enddt: Option<String>,

    #[serde(
        rename = "Location",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Values of the wrong shape read as absent instead of failing the
/// whole context.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| serde_json::from_value(v).ok()))
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings, with numbers and booleans taken as their JSON text.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_text))
}

/// Numbers, or strings holding one.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn text_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Only a literal JSON `true` turns a flag on.
fn strict_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(_) => Some(false),
    })
}

/// =============================
/// Dialog Engine Reply
/// =============================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub output: Output,

    #[serde(default)]
    pub context: Context,

    /// Intents, entities and the rest of the engine payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, deserialize_with = "text_segments")]
    pub text: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts a single string or an array of segments.
fn text_segments<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    })
}

/// =============================
/// Account Data Records
/// =============================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient_id")]
    pub customer_id: u64,

    #[serde(default, deserialize_with = "text_or_empty")]
    pub fname: String,

    #[serde(default, deserialize_with = "text_or_empty")]
    pub lname: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub number: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub balance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_credit: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_statement_balance: Option<f64>,
}

/// Account with its amounts already rendered as currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub number: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub balance: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_credit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_statement_balance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(alias = "t_date")]
    pub date: String,

    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Counterparty name shown in the ledger table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bname: Option<String>,

    /// `ח` marks a debit; anything else is a credit.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Transaction {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_date(&self.date)
    }

    /// Label for the ledger: counterparty, falling back to description.
    pub fn label(&self) -> Option<&str> {
        self.bname.as_deref().or(self.description.as_deref())
    }

    pub fn is_debit(&self) -> bool {
        self.kind.as_deref() == Some("ח")
    }
}

/// Parse the date shapes found in transaction records and dialog context.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total: f64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub location: String,

    #[serde(default, alias = "b_address")]
    pub address: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub hours: String,
}

/// =============================
/// Image Classification
/// =============================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAttributes {
    pub age: AgeRange,
    pub gender: String,
}

impl FaceAttributes {
    pub fn mean_age(&self) -> f64 {
        (self.age.min as f64 + self.age.max as f64) / 2.0
    }
}
