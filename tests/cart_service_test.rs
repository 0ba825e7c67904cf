mod common;

use common::{cart_rows, date, fetch_product, seed_product, seed_sale, TestApp};
use rust_decimal_macros::dec;
use storefront_api::{errors::ServiceError, services::cart::CartOwner};

#[tokio::test]
async fn add_merges_quantities_into_one_line() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&owner, product_id, 2)
        .await
        .expect("first add failed");
    let lines = app
        .state
        .services
        .cart
        .add(&owner, product_id, 3)
        .await
        .expect("second add failed");

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].count, 5);
    // Merged, not duplicated: exactly one row persisted.
    assert_eq!(cart_rows(&app).await.len(), 1);
}

#[tokio::test]
async fn remove_past_zero_deletes_the_line() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&owner, product_id, 2)
        .await
        .expect("add failed");
    let lines = app
        .state
        .services
        .cart
        .remove(&owner, product_id, 5)
        .await
        .expect("remove failed");

    assert!(lines.is_empty());
    assert!(cart_rows(&app).await.is_empty());
}

#[tokio::test]
async fn partial_remove_keeps_decremented_count() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&owner, product_id, 5)
        .await
        .expect("add failed");
    let lines = app
        .state
        .services
        .cart
        .remove(&owner, product_id, 2)
        .await
        .expect("remove failed");

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].count, 3);
}

#[tokio::test]
async fn removing_from_missing_line_is_a_noop() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Identified(1);

    let lines = app
        .state
        .services
        .cart
        .remove(&owner, product_id, 2)
        .await
        .expect("remove failed");

    assert!(lines.is_empty());
}

#[tokio::test]
async fn listing_an_empty_anonymous_cart_persists_nothing() {
    let app = TestApp::new().await;
    seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Anonymous("sess-1".to_string());

    let lines = app.state.services.cart.list(&owner).await.expect("list failed");

    assert!(lines.is_empty());
    assert!(cart_rows(&app).await.is_empty());
}

#[tokio::test]
async fn anonymous_and_identified_carts_are_separate() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let session = CartOwner::Anonymous("sess-1".to_string());
    let user = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&session, product_id, 2)
        .await
        .expect("session add failed");
    app.state
        .services
        .cart
        .add(&user, product_id, 3)
        .await
        .expect("user add failed");

    let session_lines = app.state.services.cart.list(&session).await.unwrap();
    let user_lines = app.state.services.cart.list(&user).await.unwrap();

    assert_eq!(session_lines.len(), 1);
    assert_eq!(session_lines[0].count, 2);
    assert_eq!(user_lines.len(), 1);
    assert_eq!(user_lines[0].count, 3);
    assert_eq!(cart_rows(&app).await.len(), 2);
}

#[tokio::test]
async fn adding_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let owner = CartOwner::Identified(1);

    let err = app
        .state
        .services
        .cart
        .add(&owner, 999, 1)
        .await
        .expect_err("add should fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn list_shows_live_product_price() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(4.00), 50).await;
    let owner = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&owner, product_id, 1)
        .await
        .expect("add failed");

    common::set_product_price(&app, product_id, dec!(3.50)).await;

    let lines = app.state.services.cart.list(&owner).await.unwrap();
    assert_eq!(lines[0].price, dec!(3.50));
}

#[tokio::test]
async fn creating_a_line_resyncs_active_sale_price() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Mug", dec!(10.00), 50).await;
    seed_sale(&app, product_id, dec!(7.00), date(2024, 3, 1), date(2024, 3, 10)).await;
    app.state
        .services
        .pricing
        .reconcile(date(2024, 3, 5))
        .await
        .expect("reconcile failed");

    // Simulate drift: something reset the live price while the sale is active.
    common::set_product_price(&app, product_id, dec!(10.00)).await;

    let owner = CartOwner::Identified(1);
    let lines = app
        .state
        .services
        .cart
        .add(&owner, product_id, 1)
        .await
        .expect("add failed");

    assert_eq!(fetch_product(&app, product_id).await.price, dec!(7.00));
    assert_eq!(lines[0].price, dec!(7.00));
}
