//! Favorites service - saved transfer recipients

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::validation::validate_account_number;
use crate::domain::Favorite;
use crate::ports::WalletApi;

/// Owner lookup for a wallet number, before a transfer or favorite add
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientCheck {
    pub wallet_number: String,
    pub owner_name: String,
    pub is_favorite: bool,
}

/// Favorites service
pub struct FavoritesService {
    api: Arc<dyn WalletApi>,
}

impl FavoritesService {
    pub fn new(api: Arc<dyn WalletApi>) -> Self {
        Self { api }
    }

    /// Favorites in insertion order
    pub async fn list(&self) -> Result<Vec<Favorite>> {
        self.api.favorites().await
    }

    pub async fn add(&self, wallet_number: &str) -> Result<Favorite> {
        validate_account_number(wallet_number)?;
        self.api.add_favorite(wallet_number.trim()).await
    }

    pub async fn remove(&self, wallet_number: &str) -> Result<()> {
        validate_account_number(wallet_number)?;
        self.api.remove_favorite(wallet_number.trim()).await
    }

    /// Resolve the owner of a wallet number and whether it is saved
    pub async fn check(&self, wallet_number: &str) -> Result<RecipientCheck> {
        validate_account_number(wallet_number)?;
        let wallet_number = wallet_number.trim();

        let (owner, favorites) = tokio::join!(
            self.api.wallet_owner(wallet_number),
            self.api.favorites()
        );
        let owner_name = owner.map_err(|e| match e {
            Error::NotFound(_) => Error::not_found("Receiver wallet number is not found"),
            other => other,
        })?;

        Ok(RecipientCheck {
            wallet_number: wallet_number.to_string(),
            owner_name,
            is_favorite: favorites?.iter().any(|f| f.wallet_number == wallet_number),
        })
    }
}
