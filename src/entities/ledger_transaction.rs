use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single ledger entry against one account. Double-entry postings create a
/// debit leg and a matching credit leg in the same database transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub entry_type: EntryType,
    /// Always positive; direction is carried by `entry_type`
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum EntryType {
    #[sea_orm(string_value = "debit")]
    Debit,
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl EntryType {
    pub fn offset(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

impl Model {
    pub fn is_debit(&self) -> bool {
        self.entry_type == EntryType::Debit
    }

    /// Signed amount under the credits-minus-debits balance convention
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn offset_flips_direction() {
        assert_eq!(EntryType::Debit.offset(), EntryType::Credit);
        assert_eq!(EntryType::Credit.offset(), EntryType::Debit);
    }

    #[test]
    fn signed_amount_convention() {
        let entry = Model {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            entry_type: EntryType::Debit,
            amount: dec!(100.00),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: None,
            created_at: Utc::now(),
        };
        assert_eq!(entry.signed_amount(), dec!(-100.00));
    }
}
