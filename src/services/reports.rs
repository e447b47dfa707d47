use crate::{
    entities::{product, sale, Product, Sale, SaleItem},
    errors::ServiceError,
    services::inventory::{InventoryService, StockSummary},
};
use chrono::{Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Dashboard aggregates: earnings over time, best-selling products, and
/// stock health. Each figure is one range query plus a linear pass.
pub struct ReportsService {
    db: Arc<DatabaseConnection>,
    inventory: Arc<InventoryService>,
}

impl ReportsService {
    pub fn new(db: Arc<DatabaseConnection>, inventory: Arc<InventoryService>) -> Self {
        Self { db, inventory }
    }

    /// Twelve monthly earnings buckets for the year, with annual total and
    /// monthly average
    #[instrument(skip(self))]
    pub async fn monthly_earnings(&self, year: i32) -> Result<MonthlyEarnings, ServiceError> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).unwrap();

        let sales = Sale::find()
            .filter(sale::Column::CreatedAt.gte(start))
            .filter(sale::Column::CreatedAt.lt(end))
            .all(&*self.db)
            .await?;

        let mut monthly = vec![Decimal::ZERO; 12];
        for sale in &sales {
            monthly[sale.created_at.month0() as usize] += sale.grand_total;
        }

        let annual_total: Decimal = monthly.iter().copied().sum();
        let monthly_average = (annual_total / Decimal::from(12)).round_dp(2);

        Ok(MonthlyEarnings {
            year,
            monthly,
            annual_total,
            monthly_average,
        })
    }

    /// Best sellers by units sold across all recorded sales
    #[instrument(skip(self))]
    pub async fn top_selling_products(
        &self,
        limit: usize,
    ) -> Result<Vec<TopProduct>, ServiceError> {
        let lines = SaleItem::find().all(&*self.db).await?;

        let mut units: HashMap<Uuid, i64> = HashMap::new();
        for line in &lines {
            *units.entry(line.product_id).or_default() += line.quantity as i64;
        }

        let mut ranked: Vec<(Uuid, i64)> = units.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);

        let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
        let names: HashMap<Uuid, String> = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(ranked
            .into_iter()
            .map(|(product_id, units_sold)| TopProduct {
                product_id,
                name: names
                    .get(&product_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown product".to_string()),
                units_sold,
            })
            .collect())
    }

    /// Everything the dashboard page needs in one call
    pub async fn dashboard(&self, year: i32) -> Result<Dashboard, ServiceError> {
        let earnings = self.monthly_earnings(year).await?;
        let top_products = self.top_selling_products(3).await?;
        let stock = self.inventory.summary().await?;

        Ok(Dashboard {
            earnings,
            top_products,
            stock,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MonthlyEarnings {
    pub year: i32,
    pub monthly: Vec<Decimal>,
    pub annual_total: Decimal,
    pub monthly_average: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub earnings: MonthlyEarnings,
    pub top_products: Vec<TopProduct>,
    pub stock: StockSummary,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn monthly_average_rounds_to_cents() {
        let annual = dec!(1000.00);
        let average = (annual / Decimal::from(12)).round_dp(2);
        assert_eq!(average, dec!(83.33));
    }

    #[test]
    fn empty_year_averages_to_zero() {
        let annual = Decimal::ZERO;
        let average = (annual / Decimal::from(12)).round_dp(2);
        assert_eq!(average, Decimal::ZERO);
    }
}
