//! Favorite recipient domain model

use serde::{Deserialize, Serialize};

/// A saved transfer recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub owner_name: String,
    pub wallet_number: String,
    #[serde(default)]
    pub wallet_name: Option<String>,
}

impl Favorite {
    pub fn new(
        id: impl Into<String>,
        owner_name: impl Into<String>,
        wallet_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_name: owner_name.into(),
            wallet_number: wallet_number.into(),
            wallet_name: None,
        }
    }
}
