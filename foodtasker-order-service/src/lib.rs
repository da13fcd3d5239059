use std::sync::Arc;

use chrono::FixedOffset;

pub mod catalog;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod location;
pub mod models;
pub mod revenue;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;

pub use catalog::CatalogReader;
pub use dispatch::DispatchCoordinator;
pub use ledger::{LineItem, LineItems, OrderLedger};
pub use location::LocationReporter;
pub use revenue::{RevenueAggregator, WeeklyRevenue};

use clock::Clock;
use store::OrderStore;

/// Every order-side service wired to one store and one clock.
#[derive(Clone)]
pub struct OrderServices {
    pub store: Arc<dyn OrderStore>,
    pub catalog: CatalogReader,
    pub ledger: OrderLedger,
    pub dispatch: DispatchCoordinator,
    pub revenue: RevenueAggregator,
    pub location: LocationReporter,
}

impl OrderServices {
    pub fn new(
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        revenue_offset: FixedOffset,
    ) -> Self {
        Self {
            catalog: CatalogReader::new(store.clone()),
            ledger: OrderLedger::new(store.clone(), clock.clone()),
            dispatch: DispatchCoordinator::new(store.clone(), clock.clone()),
            revenue: RevenueAggregator::new(store.clone(), clock.clone(), revenue_offset),
            location: LocationReporter::new(store.clone()),
            store,
        }
    }
}
