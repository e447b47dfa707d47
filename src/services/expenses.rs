use crate::{
    entities::{expense, Expense},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Operational expenses (rent, utilities, fuel) recorded outside the
/// purchasing workflow
pub struct ExpensesService {
    db: Arc<DatabaseConnection>,
}

impl ExpensesService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create_expense(
        &self,
        input: CreateExpenseInput,
    ) -> Result<expense::Model, ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Expense amount must be positive".to_string(),
            ));
        }
        if input.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Expense description must not be empty".to_string(),
            ));
        }

        let model = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            incurred_at: Set(input.incurred_at.unwrap_or_else(Utc::now)),
            description: Set(input.description),
            amount: Set(input.amount),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_expenses(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<expense::Model>, u64), ServiceError> {
        let paginator = Expense::find()
            .order_by_desc(expense::Column::IncurredAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Twelve per-month expense totals for the given year
    pub async fn monthly_totals(&self, year: i32) -> Result<MonthlyExpenses, ServiceError> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).unwrap();

        let expenses = Expense::find()
            .filter(expense::Column::IncurredAt.gte(start))
            .filter(expense::Column::IncurredAt.lt(end))
            .all(&*self.db)
            .await?;

        Ok(MonthlyExpenses {
            year,
            monthly: bucket_by_month(&expenses),
        })
    }
}

fn bucket_by_month(expenses: &[expense::Model]) -> Vec<Decimal> {
    let mut monthly = vec![Decimal::ZERO; 12];
    for expense in expenses {
        let month = expense.incurred_at.month0() as usize;
        monthly[month] += expense.amount;
    }
    monthly
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseInput {
    pub incurred_at: Option<DateTime<Utc>>,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MonthlyExpenses {
    pub year: i32,
    pub monthly: Vec<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expense(month: u32, amount: Decimal) -> expense::Model {
        expense::Model {
            id: Uuid::new_v4(),
            incurred_at: Utc.with_ymd_and_hms(2024, month, 15, 12, 0, 0).unwrap(),
            description: "utilities".to_string(),
            amount,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expenses_bucket_into_their_month() {
        let expenses = vec![
            expense(1, dec!(100.00)),
            expense(1, dec!(50.00)),
            expense(12, dec!(75.00)),
        ];
        let monthly = bucket_by_month(&expenses);
        assert_eq!(monthly[0], dec!(150.00));
        assert_eq!(monthly[11], dec!(75.00));
        assert_eq!(monthly[5], Decimal::ZERO);
        assert_eq!(monthly.len(), 12);
    }
}
