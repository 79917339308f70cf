//! Watchlist screening: what is asked of the provider, what comes back, and
//! how a query becomes a persisted search.

pub mod classify;
pub mod client;
pub mod input;
pub mod pipeline;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

pub use classify::{classify, Classification};

/// One of the three query shapes the provider understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreeningQuery {
    ById { identification: String },
    ByName { name: String },
    ByIdAndName { identification: String, name: String },
}

impl ScreeningQuery {
    /// Pick the query shape from the inputs present. Combined beats id beats name.
    pub fn from_parts(identification: Option<String>, name: Option<String>) -> Option<Self> {
        match (identification, name) {
            (Some(identification), Some(name)) => {
                Some(ScreeningQuery::ByIdAndName { identification, name })
            }
            (Some(identification), None) => Some(ScreeningQuery::ById { identification }),
            (None, Some(name)) => Some(ScreeningQuery::ByName { name }),
            (None, None) => None,
        }
    }

    /// Human description stored as the search term.
    pub fn term(&self) -> String {
        let term = match self {
            ScreeningQuery::ById { identification } => format!("ID: {identification}"),
            ScreeningQuery::ByName { name } => format!("Nombre: {name}"),
            ScreeningQuery::ByIdAndName { identification, name } => {
                format!("ID: {identification} y Nombre: {name}")
            }
        };
        term.chars().take(100).collect()
    }

    pub fn path(&self) -> &'static str {
        match self {
            ScreeningQuery::ById { .. } => "identificacion",
            ScreeningQuery::ByName { .. } => "nombre",
            ScreeningQuery::ByIdAndName { .. } => "identificacion-nombre",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ScreeningQuery::ById { identification } => json!({ "Identificacion": identification }),
            ScreeningQuery::ByName { name } => json!({ "Nombre": name }),
            ScreeningQuery::ByIdAndName { identification, name } => {
                json!({ "Identificacion": identification, "Nombre": name })
            }
        }
    }
}

/// A hit as returned by the provider, before classification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "NombreCompleto", default, deserialize_with = "lenient_string")]
    pub full_name: Option<String>,
    #[serde(rename = "Id", default, deserialize_with = "lenient_string")]
    pub identification: Option<String>,
    #[serde(rename = "Tipo_Lista", default, deserialize_with = "lenient_string")]
    pub list_type: Option<String>,
    #[serde(rename = "Origen_Lista", default, deserialize_with = "lenient_string")]
    pub list_origin: Option<String>,
    #[serde(rename = "Relacionado_Con", default, deserialize_with = "lenient_string")]
    pub related_to: Option<String>,
    #[serde(rename = "Fuente", default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(rename = "Restrictiva", default, deserialize_with = "lenient_bool")]
    pub restrictive: bool,
    #[serde(rename = "Boletin", default, deserialize_with = "lenient_bool")]
    pub bulletin: bool,
    #[serde(rename = "Aka", default, deserialize_with = "lenient_string")]
    pub alias: Option<String>,
    #[serde(rename = "CoincidenciaNombre", default, deserialize_with = "lenient_int")]
    pub name_match: i32,
    #[serde(rename = "CoincidenciaID", default, deserialize_with = "lenient_int")]
    pub id_match: i32,
    #[serde(rename = "Tipo_Persona", default, deserialize_with = "lenient_string")]
    pub person_type: Option<String>,
    #[serde(rename = "Fecha_Update", default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(rename = "Estado", default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "LlaveImagen", default, deserialize_with = "lenient_string")]
    pub image_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("screening request failed: {0}")]
    Transport(String),

    #[error("screening provider answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable screening response: {0}")]
    Decode(String),
}

/// The external watchlist provider.
#[async_trait]
pub trait ScreeningClient: Send + Sync {
    /// `Ok(None)` when the provider answers with no list at all.
    async fn query(&self, query: &ScreeningQuery) -> Result<Option<Vec<RawRecord>>, ScreeningError>;
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_uppercase().as_str(),
            "TRUE" | "SI" | "S" | "1" | "YES"
        ),
        _ => false,
    })
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
