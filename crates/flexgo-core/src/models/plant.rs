use serde::{Deserialize, Serialize};

/// A registered installation. Only `id` is relied upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlantsResponse {
    pub items: Vec<Plant>,
}
