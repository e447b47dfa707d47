mod common;

use common::TestApp;
use storefront_api::{errors::ServiceError, services::customers::CustomerInput};

fn input(first_name: &str) -> CustomerInput {
    CustomerInput {
        user_id: None,
        first_name: first_name.to_string(),
        last_name: Some("Okello".to_string()),
        email: Some("okello@example.com".to_string()),
        phone: Some("+256700123456".to_string()),
        address: None,
    }
}

#[tokio::test]
async fn customers_round_trip_through_crud() {
    let app = TestApp::new().await;
    let customers = &app.state.services.customers;

    let created = customers.create_customer(input("Grace")).await.unwrap();
    assert_eq!(created.first_name, "Grace");

    let mut update = input("Grace");
    update.address = Some("Plot 4, Kira Road".to_string());
    let updated = customers
        .update_customer(created.id, update)
        .await
        .unwrap();
    assert_eq!(updated.address.as_deref(), Some("Plot 4, Kira Road"));

    customers.delete_customer(created.id).await.unwrap();
    assert!(matches!(
        customers.get_customer(created.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn invalid_emails_and_phones_are_rejected() {
    let app = TestApp::new().await;
    let customers = &app.state.services.customers;

    let mut bad_email = input("Grace");
    bad_email.email = Some("not-an-email".to_string());
    assert!(matches!(
        customers.create_customer(bad_email).await,
        Err(ServiceError::ValidationError(_))
    ));

    let mut bad_phone = input("Grace");
    bad_phone.phone = Some("call me maybe".to_string());
    assert!(matches!(
        customers.create_customer(bad_phone).await,
        Err(ServiceError::ValidationError(_))
    ));

    let blank_name = CustomerInput {
        user_id: None,
        first_name: "  ".to_string(),
        last_name: None,
        email: None,
        phone: None,
        address: None,
    };
    assert!(matches!(
        customers.create_customer(blank_name).await,
        Err(ServiceError::ValidationError(_))
    ));
}

#[tokio::test]
async fn lookup_returns_full_names_for_the_pos_picker() {
    let app = TestApp::new().await;
    let customers = &app.state.services.customers;

    customers.create_customer(input("Grace")).await.unwrap();
    let mut second = input("Aaron");
    second.email = Some("aaron@example.com".to_string());
    customers.create_customer(second).await.unwrap();

    let options = customers.lookup().await.unwrap();
    assert_eq!(options.len(), 2);
    // Sorted by first name
    assert_eq!(options[0].label, "Aaron Okello");
    assert_eq!(options[1].label, "Grace Okello");
}
