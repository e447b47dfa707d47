use crate::{
    entities::{
        account::{self, AccountType},
        ledger_transaction::{self, EntryType},
        Account, LedgerTransaction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Double-entry finance ledger over a chart of accounts.
///
/// Accounts are transaction endpoints; every posting is a positive amount
/// with an explicit debit/credit direction. Double-entry postings write both
/// legs atomically, so debit and credit totals balance by construction. The
/// ledger report runs one chronological pass over an account's transactions,
/// accumulating a running balance under the credits-minus-debits convention.
pub struct FinanceService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FinanceService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    // ---- chart of accounts ----

    /// Creates an account. Account numbers must be unique and numeric.
    #[instrument(skip(self, input))]
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<account::Model, ServiceError> {
        validate_account_number(&input.account_number)?;

        let existing = Account::find()
            .filter(account::Column::AccountNumber.eq(input.account_number.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Account number {} is already in use",
                input.account_number
            )));
        }

        let account_id = Uuid::new_v4();
        let model = account::ActiveModel {
            id: Set(account_id),
            account_number: Set(input.account_number),
            account_name: Set(input.account_name),
            account_type: Set(input.account_type),
            description: Set(input.description),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::AccountCreated(account_id))
            .await;
        info!("Created account {} ({})", created.account_number, account_id);
        Ok(created)
    }

    pub async fn update_account(
        &self,
        account_id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<account::Model, ServiceError> {
        let existing = self.load_account(account_id).await?;

        if let Some(number) = &input.account_number {
            validate_account_number(number)?;
            let clash = Account::find()
                .filter(account::Column::AccountNumber.eq(number.clone()))
                .filter(account::Column::Id.ne(account_id))
                .one(&*self.db)
                .await?;
            if clash.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Account number {} is already in use",
                    number
                )));
            }
        }

        let mut active: account::ActiveModel = existing.into();
        if let Some(number) = input.account_number {
            active.account_number = Set(number);
        }
        if let Some(name) = input.account_name {
            active.account_name = Set(name);
        }
        if let Some(account_type) = input.account_type {
            active.account_type = Set(account_type);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes an account together with its transactions
    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), ServiceError> {
        let account = self.load_account(account_id).await?;
        account.delete(&*self.db).await?;
        Ok(())
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<account::Model, ServiceError> {
        self.load_account(account_id).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<account::Model>, ServiceError> {
        Ok(Account::find()
            .order_by_asc(account::Column::AccountNumber)
            .all(&*self.db)
            .await?)
    }

    /// Chart of accounts grouped by account type, in the conventional
    /// asset / liability / equity / revenue / expense order
    pub async fn accounts_by_type(&self) -> Result<Vec<AccountGroup>, ServiceError> {
        let accounts = self.list_accounts().await?;

        let mut grouped: HashMap<AccountType, Vec<account::Model>> = HashMap::new();
        for account in accounts {
            grouped.entry(account.account_type).or_default().push(account);
        }

        let order = [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ];
        Ok(order
            .into_iter()
            .filter_map(|account_type| {
                grouped.remove(&account_type).map(|accounts| AccountGroup {
                    account_type,
                    accounts,
                })
            })
            .collect())
    }

    // ---- transactions ----

    /// Posts a single ledger entry against one account
    #[instrument(skip(self, input))]
    pub async fn record_transaction(
        &self,
        input: RecordTransactionInput,
    ) -> Result<ledger_transaction::Model, ServiceError> {
        validate_amount(input.amount)?;
        self.load_account(input.account_id).await?;

        let model = ledger_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(input.account_id),
            entry_type: Set(input.entry_type),
            amount: Set(input.amount),
            transaction_date: Set(input.transaction_date),
            description: Set(input.description),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::TransactionPosted {
                account_id: input.account_id,
                amount: input.amount,
            })
            .await;
        Ok(created)
    }

    /// Posts both legs of a double-entry transaction atomically: the debit
    /// leg against `debit_account_id` and an equal credit leg against
    /// `credit_account_id`.
    #[instrument(skip(self, input))]
    pub async fn record_double_entry(
        &self,
        input: DoubleEntryInput,
    ) -> Result<DoubleEntryPosting, ServiceError> {
        validate_amount(input.amount)?;
        if input.debit_account_id == input.credit_account_id {
            return Err(ServiceError::ValidationError(
                "Debit and credit accounts must differ".to_string(),
            ));
        }
        self.load_account(input.debit_account_id).await?;
        self.load_account(input.credit_account_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let debit = ledger_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(input.debit_account_id),
            entry_type: Set(EntryType::Debit),
            amount: Set(input.amount),
            transaction_date: Set(input.transaction_date),
            description: Set(input.description.clone()),
            created_at: Set(now),
        };
        let debit = debit.insert(&txn).await?;

        let credit = ledger_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(input.credit_account_id),
            entry_type: Set(EntryType::Credit),
            amount: Set(input.amount),
            transaction_date: Set(input.transaction_date),
            description: Set(input.description),
            created_at: Set(now),
        };
        let credit = credit.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::DoubleEntryPosted {
                debit_account_id: input.debit_account_id,
                credit_account_id: input.credit_account_id,
                amount: input.amount,
            })
            .await;
        info!(
            "Posted double entry of {} from {} to {}",
            input.amount, input.credit_account_id, input.debit_account_id
        );
        Ok(DoubleEntryPosting { debit, credit })
    }

    /// Date-ranged ledger for one account with a per-row running balance.
    /// The closing balance equals total credits minus total debits.
    #[instrument(skip(self))]
    pub async fn ledger_report(
        &self,
        account_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<LedgerReport, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "Report start date is after its end date".to_string(),
            ));
        }
        let account = self.load_account(account_id).await?;

        let transactions = LedgerTransaction::find()
            .filter(ledger_transaction::Column::AccountId.eq(account_id))
            .filter(ledger_transaction::Column::TransactionDate.gte(from))
            .filter(ledger_transaction::Column::TransactionDate.lte(to))
            .order_by_asc(ledger_transaction::Column::TransactionDate)
            .order_by_asc(ledger_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let (entries, totals) = tally_ledger(transactions);
        Ok(LedgerReport {
            account,
            from,
            to,
            entries,
            total_debits: totals.debits,
            total_credits: totals.credits,
            closing_balance: totals.balance,
        })
    }

    /// Partitions every transaction into per-account debit and credit
    /// buckets, each with its resulting balance
    pub async fn account_balances(&self) -> Result<Vec<AccountBalance>, ServiceError> {
        let accounts = self.list_accounts().await?;
        let transactions = LedgerTransaction::find().all(&*self.db).await?;

        let mut buckets: HashMap<Uuid, (Decimal, Decimal)> = HashMap::new();
        for txn in &transactions {
            let bucket = buckets.entry(txn.account_id).or_default();
            match txn.entry_type {
                EntryType::Debit => bucket.0 += txn.amount,
                EntryType::Credit => bucket.1 += txn.amount,
            }
        }

        Ok(accounts
            .into_iter()
            .map(|account| {
                let (debits, credits) = buckets.remove(&account.id).unwrap_or_default();
                AccountBalance {
                    account_id: account.id,
                    account_number: account.account_number,
                    account_name: account.account_name,
                    account_type: account.account_type,
                    debits,
                    credits,
                    balance: credits - debits,
                }
            })
            .collect())
    }

    async fn load_account(&self, account_id: Uuid) -> Result<account::Model, ServiceError> {
        Account::find_by_id(account_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))
    }
}

fn validate_account_number(number: &str) -> Result<(), ServiceError> {
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(
            "Account number must contain only numeric characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_amount(amount: Decimal) -> Result<(), ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Transaction amount must be positive".to_string(),
        ));
    }
    Ok(())
}

struct LedgerTotals {
    debits: Decimal,
    credits: Decimal,
    balance: Decimal,
}

/// Single chronological pass accumulating the running balance
fn tally_ledger(
    transactions: Vec<ledger_transaction::Model>,
) -> (Vec<LedgerReportRow>, LedgerTotals) {
    let mut totals = LedgerTotals {
        debits: Decimal::ZERO,
        credits: Decimal::ZERO,
        balance: Decimal::ZERO,
    };
    let mut entries = Vec::with_capacity(transactions.len());

    for transaction in transactions {
        match transaction.entry_type {
            EntryType::Debit => totals.debits += transaction.amount,
            EntryType::Credit => totals.credits += transaction.amount,
        }
        totals.balance += transaction.signed_amount();
        entries.push(LedgerReportRow {
            running_balance: totals.balance,
            transaction,
        });
    }

    (entries, totals)
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountInput {
    pub account_number: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountInput {
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub account_type: Option<AccountType>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordTransactionInput {
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DoubleEntryInput {
    pub debit_account_id: Uuid,
    pub credit_account_id: Uuid,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
}

/// Both legs of a posted double entry
#[derive(Debug, Serialize)]
pub struct DoubleEntryPosting {
    pub debit: ledger_transaction::Model,
    pub credit: ledger_transaction::Model,
}

#[derive(Debug, Serialize)]
pub struct AccountGroup {
    pub account_type: AccountType,
    pub accounts: Vec<account::Model>,
}

#[derive(Debug, Serialize)]
pub struct LedgerReportRow {
    pub transaction: ledger_transaction::Model,
    pub running_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LedgerReport {
    pub account: account::Model,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub entries: Vec<LedgerReportRow>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub closing_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub account_number: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub debits: Decimal,
    pub credits: Decimal,
    pub balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(entry_type: EntryType, amount: Decimal, day: u32) -> ledger_transaction::Model {
        ledger_transaction::Model {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            entry_type,
            amount,
            transaction_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn account_numbers_must_be_numeric() {
        assert!(validate_account_number("1001").is_ok());
        assert!(validate_account_number("10a1").is_err());
        assert!(validate_account_number("").is_err());
        assert!(validate_account_number("10-01").is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec!(-5)).is_err());
    }

    #[test]
    fn running_balance_accumulates_credits_minus_debits() {
        let transactions = vec![
            entry(EntryType::Credit, dec!(1000.00), 1),
            entry(EntryType::Debit, dec!(250.00), 2),
            entry(EntryType::Credit, dec!(50.00), 3),
        ];

        let (rows, totals) = tally_ledger(transactions);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].running_balance, dec!(1000.00));
        assert_eq!(rows[1].running_balance, dec!(750.00));
        assert_eq!(rows[2].running_balance, dec!(800.00));
        assert_eq!(totals.debits, dec!(250.00));
        assert_eq!(totals.credits, dec!(1050.00));
        assert_eq!(totals.balance, dec!(800.00));
    }

    #[test]
    fn empty_range_yields_zero_totals() {
        let (rows, totals) = tally_ledger(vec![]);
        assert!(rows.is_empty());
        assert_eq!(totals.debits, Decimal::ZERO);
        assert_eq!(totals.credits, Decimal::ZERO);
        assert_eq!(totals.balance, Decimal::ZERO);
    }

    #[test]
    fn balance_can_go_negative_when_debits_dominate() {
        let transactions = vec![
            entry(EntryType::Debit, dec!(400.00), 1),
            entry(EntryType::Credit, dec!(150.00), 2),
        ];
        let (rows, totals) = tally_ledger(transactions);
        assert_eq!(rows.last().unwrap().running_balance, dec!(-250.00));
        assert_eq!(totals.balance, dec!(-250.00));
    }
}
