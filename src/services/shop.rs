//! Star shop: catalogue, purchases and inventory.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use crate::db::{
    InventoryEntry, ItemStatus, ItemType, Page, PurchaseOutcome, PurchaseReceipt, PurchaseRecord,
    PurchaseRejection, QuizRepository, ShopItem,
};
use crate::services::ServiceError;
use crate::services::game::check_page;

/// Largest quantity a single purchase may request.
pub const MAX_PURCHASE_QUANTITY: i32 = 10;

/// Purchase input. The item id is accepted as `item_id` or `itemId`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseRequest {
    /// Item to buy.
    #[serde(alias = "itemId")]
    pub item_id: Option<i32>,
    /// Units to buy; defaults to 1.
    pub quantity: Option<i32>,
}

/// A page of purchases with the user's total purchase count.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct PurchaseHistory {
    purchases: Vec<PurchaseRecord>,
    count: usize,
    total: i64,
}

/// Service layer for the shop.
#[derive(Debug, Clone)]
pub struct ShopService {
    repository: QuizRepository,
}

impl ShopService {
    /// Creates a new shop service.
    #[instrument(skip(repository))]
    pub fn new(repository: QuizRepository) -> Self {
        info!("Creating ShopService");
        Self { repository }
    }

    /// Lists items with `status` (default active), optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for an unknown status or item type.
    #[instrument(skip(self))]
    pub fn items(
        &self,
        status: Option<&str>,
        item_type: Option<&str>,
    ) -> Result<Vec<ShopItem>, ServiceError> {
        let status = match status.filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<ItemStatus>()
                .map_err(|_| ServiceError::bad_request(format!("Unknown status '{}'", raw)))?,
            None => ItemStatus::Active,
        };
        let item_type = item_type
            .filter(|t| !t.is_empty())
            .map(|raw| {
                raw.parse::<ItemType>()
                    .map_err(|_| ServiceError::bad_request(format!("Unknown item_type '{}'", raw)))
            })
            .transpose()?;

        let item_type = item_type.map(|t| t.to_string());

        Ok(self
            .repository
            .list_items(status.as_ref(), item_type.as_deref())?)
    }

    /// Buys an item with stars.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for a missing item id, a quantity outside
    /// `1..=10`, an unknown or inactive item, short stock, or too few stars.
    /// The last carries `required`, `current` and `shortage`.
    #[instrument(skip(self))]
    pub fn purchase(
        &self,
        user_id: i32,
        request: PurchaseRequest,
    ) -> Result<PurchaseReceipt, ServiceError> {
        let item_id = request
            .item_id
            .ok_or_else(|| ServiceError::bad_request("item_id is required"))?;
        let quantity = request.quantity.unwrap_or(1);
        if !(1..=MAX_PURCHASE_QUANTITY).contains(&quantity) {
            return Err(ServiceError::bad_request(format!(
                "Quantity must be between 1 and {}",
                MAX_PURCHASE_QUANTITY
            )));
        }

        let outcome = self
            .repository
            .purchase(user_id, item_id, quantity)
            .map_err(|e| match e.kind {
                crate::db::DbErrorKind::NotFound => ServiceError::not_found("User not found"),
                _ => ServiceError::from(e),
            })?;

        match outcome {
            PurchaseOutcome::Completed(receipt) => {
                info!(
                    user_id,
                    purchase_id = receipt.purchase_id(),
                    stars_spent = receipt.stars_spent(),
                    "🛒 Purchase successful"
                );
                Ok(receipt)
            }
            PurchaseOutcome::Rejected(PurchaseRejection::UnknownItem) => {
                Err(ServiceError::not_found("Item not found"))
            }
            PurchaseOutcome::Rejected(PurchaseRejection::Unavailable) => Err(
                ServiceError::bad_request("Item is not available for purchase"),
            ),
            PurchaseOutcome::Rejected(PurchaseRejection::InsufficientStock) => {
                Err(ServiceError::bad_request("Insufficient stock"))
            }
            PurchaseOutcome::Rejected(PurchaseRejection::NotEnoughStars { required, current }) => {
                warn!(user_id, required, current, "Not enough stars");
                let mut extra = Map::new();
                extra.insert("required".into(), json!(required));
                extra.insert("current".into(), json!(current));
                extra.insert("shortage".into(), Value::from(i64::from(required) - i64::from(current)));
                Err(ServiceError::bad_request("Not enough stars").with_extra(extra))
            }
        }
    }

    /// Lists the user's purchases, most recent first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the page is invalid.
    #[instrument(skip(self))]
    pub fn purchases(&self, user_id: i32, page: Page) -> Result<PurchaseHistory, ServiceError> {
        check_page(&page)?;
        let purchases = self.repository.list_purchases(user_id, page)?;
        let total = self.repository.count_purchases(user_id)?;

        Ok(PurchaseHistory {
            count: purchases.len(),
            purchases,
            total,
        })
    }

    /// Sums the user's completed purchases per item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the query fails.
    #[instrument(skip(self))]
    pub fn inventory(&self, user_id: i32) -> Result<Vec<InventoryEntry>, ServiceError> {
        Ok(self.repository.inventory(user_id)?)
    }
}
