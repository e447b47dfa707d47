use crate::{
    entities::{customer, Customer},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_customer(
        &self,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        validate_customer(&input)?;

        let now = Utc::now();
        let customer_id = Uuid::new_v4();
        let model = customer::ActiveModel {
            id: Set(customer_id),
            user_id: Set(input.user_id),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CustomerCreated(customer_id))
            .await;
        Ok(created)
    }

    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        validate_customer(&input)?;
        let existing = self.load(customer_id).await?;

        let mut active: customer::ActiveModel = existing.into();
        active.user_id = Set(input.user_id);
        active.first_name = Set(input.first_name);
        active.last_name = Set(input.last_name);
        active.email = Set(input.email);
        active.phone = Set(input.phone);
        active.address = Set(input.address);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let customer = self.load(customer_id).await?;
        customer.delete(&*self.db).await?;
        Ok(())
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        self.load(customer_id).await
    }

    pub async fn list_customers(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let paginator = Customer::find()
            .order_by_asc(customer::Column::FirstName)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Name/id pairs for the POS customer picker
    pub async fn lookup(&self) -> Result<Vec<CustomerOption>, ServiceError> {
        let customers = Customer::find()
            .order_by_asc(customer::Column::FirstName)
            .all(&*self.db)
            .await?;
        Ok(customers
            .into_iter()
            .map(|c| CustomerOption {
                value: c.id,
                label: c.full_name(),
            })
            .collect())
    }

    async fn load(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }
}

fn validate_customer(input: &CustomerInput) -> Result<(), ServiceError> {
    if input.first_name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "First name must not be empty".to_string(),
        ));
    }
    if let Some(email) = &input.email {
        if !validator::validate_email(email) {
            return Err(ServiceError::ValidationError(format!(
                "{} is not a valid email address",
                email
            )));
        }
    }
    if let Some(phone) = &input.phone {
        if !PHONE_RE.is_match(phone) {
            return Err(ServiceError::ValidationError(format!(
                "{} is not a valid phone number",
                phone
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CustomerInput {
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Label/value pair for select widgets
#[derive(Debug, Serialize)]
pub struct CustomerOption {
    pub value: Uuid,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CustomerInput {
        CustomerInput {
            user_id: None,
            first_name: "Grace".to_string(),
            last_name: Some("Nakato".to_string()),
            email: Some("grace@example.com".to_string()),
            phone: Some("+256700000001".to_string()),
            address: None,
        }
    }

    #[test]
    fn valid_customer_passes() {
        assert!(validate_customer(&input()).is_ok());
    }

    #[test]
    fn empty_first_name_is_rejected() {
        let mut bad = input();
        bad.first_name = "  ".to_string();
        assert!(validate_customer(&bad).is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut bad = input();
        bad.email = Some("not-an-email".to_string());
        assert!(validate_customer(&bad).is_err());
    }

    #[test]
    fn phone_numbers_must_look_like_msisdns() {
        let mut bad = input();
        bad.phone = Some("call me maybe".to_string());
        assert!(validate_customer(&bad).is_err());

        let mut ok = input();
        ok.phone = Some("0700123456".to_string());
        assert!(validate_customer(&ok).is_ok());
    }
}
