use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::{Meal, Restaurant};
use crate::store::OrderStore;

/// Read-only view over restaurants and their menus.
#[derive(Clone)]
pub struct CatalogReader {
    store: Arc<dyn OrderStore>,
}

impl CatalogReader {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Most recently added first.
    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ServiceError> {
        Ok(self.store.list_restaurants().await?)
    }

    /// Meals of one restaurant, most recently added first. An unknown
    /// restaurant simply has no meals.
    pub async fn list_meals(&self, restaurant_id: i32) -> Result<Vec<Meal>, ServiceError> {
        Ok(self.store.list_meals(restaurant_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOrderStore;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_catalog_lists_newest_first() {
        let store = Arc::new(MemoryOrderStore::new());
        let older = store
            .add_restaurant(Uuid::new_v4(), "Pho 24", "1 Main St")
            .await;
        let newer = store
            .add_restaurant(Uuid::new_v4(), "Burger Barn", "2 Main St")
            .await;
        let soup = store
            .add_meal(older.id, "Beef pho", BigDecimal::from_str("9.50").unwrap())
            .await;
        let roll = store
            .add_meal(older.id, "Spring roll", BigDecimal::from_str("3.00").unwrap())
            .await;
        store
            .add_meal(newer.id, "Cheeseburger", BigDecimal::from_str("7.25").unwrap())
            .await;

        let catalog = CatalogReader::new(store);

        let restaurants = catalog.list_restaurants().await.unwrap();
        let ids = restaurants.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![newer.id, older.id]);

        let meals = catalog.list_meals(older.id).await.unwrap();
        let ids = meals.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![roll.id, soup.id]);

        assert!(catalog.list_meals(9999).await.unwrap().is_empty());
    }
}
