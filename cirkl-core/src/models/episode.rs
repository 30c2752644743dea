use serde::{Deserialize, Serialize};

/// Free-form episode entry. The store keeps an ordered list of these but
/// nothing over HTTP writes to it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub user_id: String,
    pub recorded_at: String,
    pub content: serde_json::Value,
}
