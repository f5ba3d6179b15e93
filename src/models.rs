// Financials API - Record Schemas
// Task, Revenue and Expense are independent shapes with no shared base and no
// relationships. Every field is optional: partial documents are accepted on
// create and update.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::db::{Collection, Document, StoreError, StoreResult};

/// Timestamp field every list endpoint sorts on
pub const CREATED_AT: &str = "createdAt";

/// Type a schema field's value is cast to before it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
}

/// A record kind stored in its own collection
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;

    /// Singular name used in log lines and error messages ("Task")
    const LABEL: &'static str;

    /// Schema fields in the order they are stored
    const FIELDS: &'static [(&'static str, FieldKind)];

    fn id(&self) -> Option<&str>;
}

// ============================================================================
// TASK
// ============================================================================

/// A to-do item owned by whichever caller supplies `person`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(
        rename = "createdAt",
        default,
        with = "iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const LABEL: &'static str = "Task";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("person", FieldKind::Text),
        ("text", FieldKind::Text),
        ("completed", FieldKind::Boolean),
        (CREATED_AT, FieldKind::Date),
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ============================================================================
// REVENUE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Kept as a JSON number so `150` reads back as `150`, not `150.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Number>,

    /// Where the money came from ("consulting", "salary", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(
        rename = "createdAt",
        default,
        with = "iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Revenue {
    const COLLECTION: Collection = Collection::Revenues;
    const LABEL: &'static str = "Revenue";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("amount", FieldKind::Number),
        ("source", FieldKind::Text),
        (CREATED_AT, FieldKind::Date),
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ============================================================================
// EXPENSE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(
        rename = "createdAt",
        default,
        with = "iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;
    const LABEL: &'static str = "Expense";
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("amount", FieldKind::Number),
        ("reason", FieldKind::Text),
        (CREATED_AT, FieldKind::Date),
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ============================================================================
// CASTING
// ============================================================================

/// Reduce a request body to `T`'s schema fields, each cast to its declared
/// type. Unknown fields (including `_id`) are dropped and explicit nulls are
/// kept. A value that cannot be cast fails the whole document.
pub fn cast_document<T: Record>(mut body: Document) -> StoreResult<Document> {
    let mut doc = Document::new();
    for (field, kind) in T::FIELDS {
        if let Some(value) = body.remove(*field) {
            doc.insert(field.to_string(), cast_value(field, *kind, value)?);
        }
    }
    Ok(doc)
}

fn cast_value(field: &str, kind: FieldKind, value: Value) -> StoreResult<Value> {
    let cast = match (kind, &value) {
        (_, Value::Null) => Some(Value::Null),

        (FieldKind::Text, Value::String(_)) => Some(value.clone()),
        (FieldKind::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
        (FieldKind::Text, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Number, Value::String(s)) => parse_number(s),
        (FieldKind::Number, Value::Bool(b)) => Some(Value::from(u8::from(*b))),

        (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Boolean, Value::String(s)) => parse_bool(s).map(Value::Bool),
        (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },

        (FieldKind::Date, Value::String(s)) if s.trim().is_empty() => Some(Value::Null),
        (FieldKind::Date, Value::String(s)) => parse_date(s).map(timestamp_value),
        (FieldKind::Date, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|ms| ms as i64))
            .and_then(DateTime::from_timestamp_millis)
            .and_then(in_range)
            .map(timestamp_value),

        _ => None,
    };

    cast.ok_or_else(|| StoreError::Cast {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return Some(Value::Null);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// RFC 3339, or a bare `YYYY-MM-DD[THH:MM:SS[.fff]]` read as UTC
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;
    in_range(parsed)
}

/// Years 0000-9999 only: beyond that the text form loses its fixed width
fn in_range(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (0..=9999).contains(&dt.year()).then_some(dt)
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_value(dt: DateTime<Utc>) -> Value {
    Value::String(format_timestamp(&dt))
}

/// `createdAt` is read as any RFC 3339 timestamp and always written as
/// `YYYY-MM-DDTHH:MM:SS.sssZ`. The fixed width keeps stored values in
/// chronological order when compared as text; that holds because casting
/// refuses years outside 0000-9999.
mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&super::format_timestamp(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}
