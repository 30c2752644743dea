use chrono::{SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Body of `POST /api/connection/add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub user_id: String,
    pub connection_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub location: String,
    pub meeting_context: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub authenticity_score: f64,
    pub conversation: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Accepts a JSON number or a string holding a finite float (`"0.9"`).
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lax {
        Number(f64),
        Text(String),
    }

    match Lax::deserialize(deserializer)
        .map_err(|_| de::Error::custom("authenticity_score: expected a number"))?
    {
        Lax::Number(n) => Ok(n),
        Lax::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(de::Error::custom(format!(
                "authenticity_score: {:?} is not a valid number",
                s
            ))),
        },
    }
}

/// A stored connection. `meeting_context` and `conversation` from the request
/// are not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub user_id: String,
    pub connection_name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub location: String,
    pub authenticity_score: f64,
    pub timestamp: String,
}

impl ConnectionRecord {
    pub fn from_request(id: String, request: ConnectionRequest) -> Self {
        let ConnectionRequest {
            user_id,
            connection_name,
            role,
            company,
            location,
            authenticity_score,
            timestamp,
            meeting_context: _,
            conversation: _,
        } = request;

        Self {
            id,
            user_id,
            connection_name,
            role,
            company,
            location,
            authenticity_score,
            timestamp: timestamp.unwrap_or_else(now_iso8601),
        }
    }
}

/// `{user_id}_{seconds}` where seconds is the epoch time as a float.
pub fn connection_id(user_id: &str, epoch_micros: i64) -> String {
    let seconds = epoch_micros as f64 / 1_000_000.0;
    // Debug keeps the `.0` on whole seconds
    format!("{}_{:?}", user_id, seconds)
}

/// Current UTC time, RFC 3339 with microseconds.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
