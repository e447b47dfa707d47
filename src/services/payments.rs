use crate::{config::MobileMoneyConfig, errors::ServiceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Provider-side view of a collection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionStatus {
    Pending,
    Successful,
    Failed,
}

/// Body of a request-to-pay call
#[derive(Debug, Serialize)]
pub struct CollectionRequest<'a> {
    pub reference: Uuid,
    pub amount: String,
    pub currency: &'a str,
    pub payer: Payer<'a>,
    pub narration: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Payer<'a> {
    pub party_id_type: &'a str,
    pub party_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CollectionStatusResponse {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Thin client for the mobile-money provider's collections API.
///
/// Every call is a single synchronous attempt with the configured timeout;
/// callers decide what a failure means for the order being paid.
pub struct MobileMoneyClient {
    http: reqwest::Client,
    config: MobileMoneyConfig,
}

impl MobileMoneyClient {
    pub fn new(config: MobileMoneyConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Asks the provider to collect `amount` from `payer_phone`.
    ///
    /// The provider processes collections asynchronously, so success here only
    /// means the request was accepted; `collection_status` reports the final
    /// outcome.
    #[instrument(skip(self))]
    pub async fn request_collection(
        &self,
        reference: Uuid,
        payer_phone: &str,
        amount: Decimal,
        narration: &str,
    ) -> Result<(), ServiceError> {
        if !self.config.enabled {
            return Err(ServiceError::PaymentFailed(
                "Mobile money collections are not configured".to_string(),
            ));
        }

        let body = CollectionRequest {
            reference,
            amount: amount.to_string(),
            currency: &self.config.currency,
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: payer_phone,
            },
            narration,
        };

        let url = format!("{}/v1/collections", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Collection request transport failure: {}", e);
                ServiceError::ExternalApiError(format!("Payment provider unreachable: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Collection request {} accepted", reference);
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(ServiceError::PaymentFailed(format!(
                "Collection request rejected ({}): {}",
                status, detail
            )))
        } else {
            Err(ServiceError::ExternalApiError(format!(
                "Payment provider error ({})",
                status
            )))
        }
    }

    /// Polls the provider for the outcome of a collection request
    #[instrument(skip(self))]
    pub async fn collection_status(
        &self,
        reference: Uuid,
    ) -> Result<CollectionStatus, ServiceError> {
        if !self.config.enabled {
            return Err(ServiceError::PaymentFailed(
                "Mobile money collections are not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/v1/collections/{}",
            self.config.base_url.trim_end_matches('/'),
            reference
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalApiError(format!("Payment provider unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalApiError(format!(
                "Payment provider error ({})",
                response.status()
            )));
        }

        let payload: CollectionStatusResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalApiError(format!("Malformed provider response: {}", e))
        })?;

        if let Some(reason) = &payload.reason {
            info!("Collection {} status {}: {}", reference, payload.status, reason);
        }

        Ok(map_provider_status(&payload.status))
    }
}

fn map_provider_status(raw: &str) -> CollectionStatus {
    match raw.to_ascii_uppercase().as_str() {
        "SUCCESSFUL" | "SUCCEEDED" => CollectionStatus::Successful,
        "FAILED" | "REJECTED" | "TIMEOUT" => CollectionStatus::Failed,
        _ => CollectionStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn provider_status_mapping() {
        assert_eq!(map_provider_status("SUCCESSFUL"), CollectionStatus::Successful);
        assert_eq!(map_provider_status("successful"), CollectionStatus::Successful);
        assert_eq!(map_provider_status("FAILED"), CollectionStatus::Failed);
        assert_eq!(map_provider_status("REJECTED"), CollectionStatus::Failed);
        assert_eq!(map_provider_status("PENDING"), CollectionStatus::Pending);
        assert_eq!(map_provider_status("IN_PROGRESS"), CollectionStatus::Pending);
    }

    #[tokio::test]
    async fn disabled_client_rejects_collection() {
        let client = MobileMoneyClient::new(MobileMoneyConfig::default()).unwrap();
        let err = client
            .request_collection(Uuid::new_v4(), "+256700000001", dec!(15000), "ORD-TEST")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PaymentFailed(_)));
    }

    #[test]
    fn collection_request_serializes_amount_as_string() {
        let reference = Uuid::new_v4();
        let body = CollectionRequest {
            reference,
            amount: dec!(2500.50).to_string(),
            currency: "UGX",
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: "+256700000001",
            },
            narration: "ORD-ABCD1234",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], "2500.50");
        assert_eq!(json["payer"]["party_id_type"], "MSISDN");
        assert_eq!(json["currency"], "UGX");
    }
}
