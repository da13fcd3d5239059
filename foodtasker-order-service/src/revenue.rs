use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::store::OrderStore;

#[derive(Clone, Debug, PartialEq)]
pub struct DailyRevenue {
    pub weekday: Weekday,
    pub date: NaiveDate,
    pub total: BigDecimal,
}

/// Seven entries, Monday first.
#[derive(Clone, Debug, PartialEq)]
pub struct WeeklyRevenue {
    days: [DailyRevenue; 7],
}

impl WeeklyRevenue {
    pub fn days(&self) -> &[DailyRevenue; 7] {
        &self.days
    }

    pub fn on(&self, weekday: Weekday) -> &BigDecimal {
        &self.days[weekday.num_days_from_monday() as usize].total
    }
}

/// Sums a driver's delivered orders per calendar day of a Monday-based week.
/// Days are cut in `offset`, so an order belongs to the day its `created_at`
/// falls on in that offset.
#[derive(Clone)]
pub struct RevenueAggregator {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl RevenueAggregator {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    pub async fn current_week(&self, driver_id: i32) -> Result<WeeklyRevenue, ServiceError> {
        self.weekly_revenue(driver_id, self.today()).await
    }

    pub async fn weekly_revenue(
        &self,
        driver_id: i32,
        reference_date: NaiveDate,
    ) -> Result<WeeklyRevenue, ServiceError> {
        let monday = week_start(reference_date);
        let from = self.start_of_day(monday);
        let until = self.start_of_day(monday + TimeDelta::days(7));

        let mut totals: [BigDecimal; 7] = std::array::from_fn(|_| BigDecimal::zero());
        for order in self
            .store
            .delivered_orders_between(driver_id, from, until)
            .await?
        {
            let day = order.created_at.with_timezone(&self.offset).date_naive();
            let index = (day - monday).num_days();
            if let Some(total) = usize::try_from(index).ok().and_then(|i| totals.get_mut(i)) {
                *total += &order.total;
            }
        }

        let days = std::array::from_fn(|i| {
            let date = monday + TimeDelta::days(i as i64);
            DailyRevenue {
                weekday: date.weekday(),
                date,
                total: totals[i].with_scale(2),
            }
        });
        Ok(WeeklyRevenue { days })
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(NaiveTime::MIN);
        Utc.from_utc_datetime(&(local - TimeDelta::seconds(self.offset.local_minus_utc().into())))
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - TimeDelta::days(date.weekday().num_days_from_monday().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_money;
    use crate::testing::{money, Fixture};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(date(2024, 5, 6)), date(2024, 5, 6));
        assert_eq!(week_start(date(2024, 5, 8)), date(2024, 5, 6));
        assert_eq!(week_start(date(2024, 5, 12)), date(2024, 5, 6));
        assert_eq!(week_start(date(2024, 5, 13)), date(2024, 5, 13));
        assert_eq!(week_start(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[tokio::test]
    async fn test_empty_week_is_all_zero() {
        let fx = Fixture::new().await;
        let revenue = fx
            .revenue(0)
            .weekly_revenue(fx.driver.id, date(2024, 5, 8))
            .await
            .unwrap();

        let weekdays = revenue.days().iter().map(|d| d.weekday).collect::<Vec<_>>();
        assert_eq!(
            weekdays,
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]
        );
        assert_eq!(revenue.days()[0].date, date(2024, 5, 6));
        assert_eq!(revenue.days()[6].date, date(2024, 5, 12));
        assert!(revenue.days().iter().all(|d| d.total == money("0")));
        assert_eq!(format_money(revenue.on(Weekday::Fri)), "0.00");
    }

    #[tokio::test]
    async fn test_delivered_orders_are_bucketed_by_day() {
        let fx = Fixture::new().await;

        // Sunday of the previous week.
        fx.delivered_order_at("2024-05-05T23:30:00Z", fx.driver.id, &[(fx.burger.id, 1)])
            .await;
        fx.delivered_order_at("2024-05-06T09:00:00Z", fx.driver.id, &[(fx.burger.id, 2)])
            .await;
        fx.delivered_order_at("2024-05-08T12:00:00Z", fx.driver.id, &[(fx.fries.id, 1)])
            .await;
        fx.delivered_order_at("2024-05-08T19:15:00Z", fx.driver.id, &[(fx.burger.id, 1)])
            .await;
        fx.delivered_order_at("2024-05-12T23:59:00Z", fx.driver.id, &[(fx.fries.id, 3)])
            .await;
        // Someone else's delivery.
        fx.delivered_order_at("2024-05-09T10:00:00Z", fx.other_driver.id, &[(fx.burger.id, 5)])
            .await;
        // Still on the way.
        fx.clock.set("2024-05-10T10:00:00Z".parse().unwrap());
        let open = fx.ready_order(&[(fx.burger.id, 1)]).await;
        fx.dispatch().claim_order(fx.driver.id, open.id).await.unwrap();

        let revenue = fx
            .revenue(0)
            .weekly_revenue(fx.driver.id, date(2024, 5, 10))
            .await
            .unwrap();

        assert_eq!(revenue.on(Weekday::Mon), &money("20.00"));
        assert_eq!(revenue.on(Weekday::Tue), &money("0"));
        assert_eq!(revenue.on(Weekday::Wed), &money("15.00"));
        assert_eq!(revenue.on(Weekday::Thu), &money("0"));
        assert_eq!(revenue.on(Weekday::Fri), &money("0"));
        assert_eq!(revenue.on(Weekday::Sat), &money("0"));
        assert_eq!(revenue.on(Weekday::Sun), &money("15.00"));
    }

    #[tokio::test]
    async fn test_days_follow_reporting_offset() {
        let fx = Fixture::new().await;
        // Monday 06:30 at UTC+9, still Sunday in UTC.
        fx.delivered_order_at("2024-05-05T21:30:00Z", fx.driver.id, &[(fx.burger.id, 1)])
            .await;

        let utc = fx
            .revenue(0)
            .weekly_revenue(fx.driver.id, date(2024, 5, 6))
            .await
            .unwrap();
        assert!(utc.days().iter().all(|d| d.total == money("0")));

        let seoul = fx.revenue(9);
        let revenue = seoul.weekly_revenue(fx.driver.id, date(2024, 5, 6)).await.unwrap();
        assert_eq!(revenue.on(Weekday::Mon), &money("10.00"));

        fx.clock.set("2024-05-12T16:00:00Z".parse().unwrap());
        assert_eq!(seoul.today(), date(2024, 5, 13));
        let next_week = seoul.current_week(fx.driver.id).await.unwrap();
        assert_eq!(next_week.days()[0].date, date(2024, 5, 13));
        assert!(next_week.days().iter().all(|d| d.total == money("0")));
    }
}
