use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Total {
    pub total: u64,
}

/// Counts broken out by dataset type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedTotal {
    pub total: u64,
    pub generic: Total,
    pub observation: Total,
    pub species_observation: Total,
}

/// Payload of `GET /api/statistics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub projects: Total,
    pub datasets: TypedTotal,
    pub records: TypedTotal,
    pub sites: Total,
}
