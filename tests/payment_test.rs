mod common;

use common::{cart_rows, fetch_product, seed_product, TestApp};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::order_history,
    errors::ServiceError,
    services::{
        cart::CartOwner,
        checkout::CardDetails,
        orders::{OrderInfoInput, OrderLineInput},
    },
};

fn valid_card() -> CardDetails {
    CardDetails {
        name: "Jane Doe".to_string(),
        number: "1234567812345678".to_string(),
        year: "27".to_string(),
        month: "05".to_string(),
        code: "123".to_string(),
    }
}

async fn order_for(app: &TestApp, product_id: i32, count: i32, user_id: i32) -> i32 {
    app.state
        .services
        .cart
        .add(&CartOwner::Identified(user_id), product_id, count)
        .await
        .expect("cart add failed");

    app.state
        .services
        .orders
        .create(
            vec![OrderLineInput {
                id: product_id,
                count,
                price: dec!(10.00),
            }],
            Some(user_id),
        )
        .await
        .expect("order create failed")
}

#[tokio::test]
async fn successful_payment_commits_stock_cart_status_and_history() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Lamp", dec!(10.00), 5).await;
    let order_id = order_for(&app, product_id, 2, 1).await;

    app.state
        .services
        .checkout
        .pay(order_id, 1, &valid_card())
        .await
        .expect("payment failed");

    let product = fetch_product(&app, product_id).await;
    assert_eq!(product.count, 3);
    assert_eq!(product.sold, 2);

    assert!(cart_rows(&app).await.is_empty());

    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert_eq!(order.status.as_deref(), Some("Paid"));

    let history = order_history::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id, 1);
    assert_eq!(history[0].order_id, order_id);
}

#[tokio::test]
async fn malformed_instrument_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Lamp", dec!(10.00), 5).await;
    let order_id = order_for(&app, product_id, 2, 1).await;

    let mut card = valid_card();
    card.number = "not-a-card-number".to_string();

    let err = app
        .state
        .services
        .checkout
        .pay(order_id, 1, &card)
        .await
        .expect_err("payment should be rejected");
    assert!(matches!(err, ServiceError::PaymentRejected(_)));

    let product = fetch_product(&app, product_id).await;
    assert_eq!(product.count, 5);
    assert_eq!(product.sold, 0);
    assert_eq!(cart_rows(&app).await.len(), 1);

    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert!(order.status.is_none());
}

#[tokio::test]
async fn stock_shortfall_rolls_back_every_line() {
    let app = TestApp::new().await;
    let plenty = seed_product(&app, "Lamp", dec!(10.00), 50).await;
    let scarce = seed_product(&app, "Vase", dec!(6.00), 1).await;
    let user = CartOwner::Identified(1);

    app.state
        .services
        .cart
        .add(&user, plenty, 2)
        .await
        .expect("cart add failed");
    app.state
        .services
        .cart
        .add(&user, scarce, 5)
        .await
        .expect("cart add failed");

    let order_id = app
        .state
        .services
        .orders
        .create(
            vec![OrderLineInput {
                id: plenty,
                count: 2,
                price: dec!(10.00),
            }],
            Some(1),
        )
        .await
        .expect("order create failed");

    let err = app
        .state
        .services
        .checkout
        .pay(order_id, 1, &valid_card())
        .await
        .expect_err("payment should fail on stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The first line was processed inside the transaction before the
    // shortfall was hit; none of it may remain committed.
    let first = fetch_product(&app, plenty).await;
    assert_eq!(first.count, 50);
    assert_eq!(first.sold, 0);
    let second = fetch_product(&app, scarce).await;
    assert_eq!(second.count, 1);
    assert_eq!(second.sold, 0);

    assert_eq!(cart_rows(&app).await.len(), 2);

    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert!(order.status.is_none());
    assert!(order_history::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn paying_a_missing_order_rolls_back_cart_drain() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Lamp", dec!(10.00), 5).await;
    app.state
        .services
        .cart
        .add(&CartOwner::Identified(1), product_id, 2)
        .await
        .expect("cart add failed");

    let err = app
        .state
        .services
        .checkout
        .pay(404, 1, &valid_card())
        .await
        .expect_err("payment should fail");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The cart walk ran before the order lookup; all of it rolls back.
    let product = fetch_product(&app, product_id).await;
    assert_eq!(product.count, 5);
    assert_eq!(product.sold, 0);
    assert_eq!(cart_rows(&app).await.len(), 1);
}

#[tokio::test]
async fn payment_only_drains_the_paying_users_cart() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Lamp", dec!(10.00), 50).await;
    let order_id = order_for(&app, product_id, 2, 1).await;

    app.state
        .services
        .cart
        .add(&CartOwner::Identified(2), product_id, 4)
        .await
        .expect("other cart add failed");
    app.state
        .services
        .cart
        .add(&CartOwner::Anonymous("sess-9".to_string()), product_id, 1)
        .await
        .expect("session cart add failed");

    app.state
        .services
        .checkout
        .pay(order_id, 1, &valid_card())
        .await
        .expect("payment failed");

    let remaining = cart_rows(&app).await;
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|row| row.user_id != Some(1)));

    // Only the paying user's two units were committed.
    let product = fetch_product(&app, product_id).await;
    assert_eq!(product.count, 48);
    assert_eq!(product.sold, 2);
}

#[tokio::test]
async fn end_to_end_checkout_scenario() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "Lamp", dec!(10.00), 5).await;
    let user = CartOwner::Identified(7);

    // add(session, P, 2)
    app.state
        .services
        .cart
        .add(&user, product_id, 2)
        .await
        .expect("cart add failed");

    // create([{P, 2, 10}])
    let order_id = app
        .state
        .services
        .orders
        .create(
            vec![OrderLineInput {
                id: product_id,
                count: 2,
                price: dec!(10.00),
            }],
            Some(7),
        )
        .await
        .expect("order create failed");

    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert_eq!(order.products.len(), 1);
    assert_eq!(order.products[0].count, 2);
    assert_eq!(order.products[0].price, dec!(10.00));
    assert!(order.total_cost.is_none());

    // add_order_info(O, {}) -> totalCost == 20
    app.state
        .services
        .orders
        .add_order_info(order_id, OrderInfoInput::default())
        .await
        .expect("add_order_info failed");
    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert_eq!(order.total_cost, Some(dec!(20.00)));

    // pay(O, validInstrument, user)
    app.state
        .services
        .checkout
        .pay(order_id, 7, &valid_card())
        .await
        .expect("payment failed");

    let product = fetch_product(&app, product_id).await;
    assert_eq!(product.count, 3);
    assert_eq!(product.sold, 2);

    let order = app.state.services.orders.get(order_id).await.unwrap();
    assert_eq!(order.status.as_deref(), Some("Paid"));

    let history = order_history::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id, 7);
    assert_eq!(history[0].order_id, order_id);

    // And the purchase shows up in the user's history.
    let past_orders = app.state.services.orders.history(7).await.unwrap();
    assert_eq!(past_orders.len(), 1);
    assert_eq!(past_orders[0].id, order_id);
}
