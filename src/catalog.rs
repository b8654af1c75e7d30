//! Catalog

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::{money::Amount, uuids::TypedUuid};

/// Variant UUID
pub type VariantUuid = TypedUuid<CatalogVariant>;

/// A sellable product variant as supplied by the catalog.
///
/// Immutable within a checkout session; the checkout core never writes back
/// to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogVariant {
    pub uuid: VariantUuid,
    pub product_name: String,
    pub unit_price: Amount,
    pub available_quantity: u32,
}

/// Errors from the catalog source.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only supplier of sellable variants.
#[automock]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists the variants currently available for sale.
    async fn list_active_variants(&self) -> Result<Vec<CatalogVariant>, CatalogError>;
}

/// A per-session snapshot of the catalog.
///
/// Loaded once at the start of a session; stock staleness within a session
/// is acceptable, there is no live stock push.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    variants: Vec<CatalogVariant>,
}

impl Catalog {
    /// Loads a snapshot from the given source.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the source could not be read.
    pub async fn load(source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let variants = source.list_active_variants().await?;

        Ok(Self { variants })
    }

    /// Looks up a variant by id.
    pub fn variant(&self, uuid: VariantUuid) -> Option<&CatalogVariant> {
        self.variants.iter().find(|variant| variant.uuid == uuid)
    }

    /// All variants in the snapshot, in catalog order.
    pub fn variants(&self) -> &[CatalogVariant] {
        &self.variants
    }

    /// Number of variants in the snapshot.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the snapshot holds no variants.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
