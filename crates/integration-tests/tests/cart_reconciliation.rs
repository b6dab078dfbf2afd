//! Cart behaviour against stock, end to end through the service.

#![allow(clippy::unwrap_used)]

use loam_core::ProductId;
use loam_integration_tests::{TestShop, customer, quantities};
use loam_storefront::services::cart::CartError;

const KELP: ProductId = ProductId::new(1);
const BONE: ProductId = ProductId::new(2);
const WORM: ProductId = ProductId::new(3);

#[tokio::test]
async fn repeated_adds_keep_one_line_per_product() {
    let shop = TestShop::with_products(&[(1, 50), (2, 50), (3, 50)]);
    let alice = customer(1);

    for product in [KELP, BONE, KELP, WORM, BONE, KELP] {
        shop.cart
            .add_to_cart(Some(&alice), product, Some(2))
            .await
            .unwrap();
    }

    let cart = shop.cart.get_cart(Some(&alice)).await.unwrap();
    assert_eq!(quantities(&cart), vec![(1, 6), (2, 4), (3, 2)]);
}

#[tokio::test]
async fn stock_five_add_three_twice() {
    let shop = TestShop::with_products(&[(1, 5)]);
    let alice = customer(1);

    let cart = shop
        .cart
        .add_to_cart(Some(&alice), KELP, Some(3))
        .await
        .unwrap();
    assert_eq!(quantities(&cart), vec![(1, 3)]);

    let err = shop
        .cart
        .add_to_cart(Some(&alice), KELP, Some(3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CartError::QuantityExceedsStock {
            in_cart: 3,
            requested: 3,
            available: 5
        }
    ));
    assert_eq!(
        quantities(&shop.cart.get_cart(Some(&alice)).await.unwrap()),
        vec![(1, 3)]
    );
}

#[tokio::test]
async fn update_sets_quantity_without_stock_check() {
    let shop = TestShop::with_products(&[(1, 5)]);
    let alice = customer(1);

    shop.cart
        .add_to_cart(Some(&alice), KELP, Some(2))
        .await
        .unwrap();
    let cart = shop
        .cart
        .update_cart_item(Some(&alice), KELP, 10)
        .await
        .unwrap();

    assert_eq!(quantities(&cart), vec![(1, 10)]);
    assert!(cart[0].exceeds_stock());
}

#[tokio::test]
async fn add_after_update_past_stock_is_refused() {
    let shop = TestShop::with_products(&[(1, 5)]);
    let alice = customer(1);

    shop.cart.add_to_cart(Some(&alice), KELP, None).await.unwrap();
    shop.cart
        .update_cart_item(Some(&alice), KELP, 10)
        .await
        .unwrap();

    let err = shop
        .cart
        .add_to_cart(Some(&alice), KELP, None)
        .await
        .unwrap_err();
    assert!(err.is_stock_error());
}

#[tokio::test]
async fn non_positive_update_removes_line() {
    let shop = TestShop::with_products(&[(1, 5), (2, 5)]);
    let alice = customer(1);

    shop.cart.add_to_cart(Some(&alice), KELP, None).await.unwrap();
    shop.cart.add_to_cart(Some(&alice), BONE, None).await.unwrap();

    let cart = shop
        .cart
        .update_cart_item(Some(&alice), KELP, 0)
        .await
        .unwrap();
    assert_eq!(quantities(&cart), vec![(2, 1)]);

    let cart = shop
        .cart
        .update_cart_item(Some(&alice), BONE, -1)
        .await
        .unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn removing_absent_line_is_a_no_op() {
    let shop = TestShop::with_products(&[(1, 5)]);
    let alice = customer(1);

    shop.cart.add_to_cart(Some(&alice), KELP, None).await.unwrap();
    let cart = shop
        .cart
        .remove_from_cart(Some(&alice), BONE)
        .await
        .unwrap();
    assert_eq!(quantities(&cart), vec![(1, 1)]);
}

#[tokio::test]
async fn clear_empties_cart() {
    let shop = TestShop::with_products(&[(1, 5), (2, 5)]);
    let alice = customer(1);

    shop.cart.add_to_cart(Some(&alice), KELP, None).await.unwrap();
    shop.cart.add_to_cart(Some(&alice), BONE, None).await.unwrap();

    assert!(shop.cart.clear_cart(Some(&alice)).await.unwrap().is_empty());
    assert!(shop.cart.get_cart(Some(&alice)).await.unwrap().is_empty());
}

#[tokio::test]
async fn carts_are_per_user() {
    let shop = TestShop::with_products(&[(1, 5)]);
    let alice = customer(1);
    let bob = customer(2);

    shop.cart
        .add_to_cart(Some(&alice), KELP, Some(4))
        .await
        .unwrap();
    let bob_cart = shop
        .cart
        .add_to_cart(Some(&bob), KELP, Some(4))
        .await
        .unwrap();

    assert_eq!(quantities(&bob_cart), vec![(1, 4)]);
    shop.cart.clear_cart(Some(&bob)).await.unwrap();
    assert_eq!(
        quantities(&shop.cart.get_cart(Some(&alice)).await.unwrap()),
        vec![(1, 4)]
    );
}

#[tokio::test]
async fn lines_survive_stock_drop_and_disappear_with_product() {
    let shop = TestShop::with_products(&[(1, 5), (2, 5)]);
    let alice = customer(1);

    shop.cart
        .add_to_cart(Some(&alice), KELP, Some(4))
        .await
        .unwrap();
    shop.cart.add_to_cart(Some(&alice), BONE, None).await.unwrap();

    shop.store.set_stock(KELP, 0).unwrap();
    let cart = shop.cart.get_cart(Some(&alice)).await.unwrap();
    assert_eq!(quantities(&cart), vec![(1, 4), (2, 1)]);
    assert!(cart[0].exceeds_stock());

    shop.store.remove_product(KELP).unwrap();
    let cart = shop.cart.get_cart(Some(&alice)).await.unwrap();
    assert_eq!(quantities(&cart), vec![(2, 1)]);
}

#[tokio::test]
async fn anonymous_caller_never_reaches_store() {
    let shop = TestShop::with_products(&[(1, 5)]);

    assert_eq!(
        shop.cart.get_cart(None).await.unwrap_err(),
        CartError::Unauthorized
    );
    assert_eq!(
        shop.cart.add_to_cart(None, KELP, Some(1)).await.unwrap_err(),
        CartError::Unauthorized
    );
    assert_eq!(
        shop.cart.update_cart_item(None, KELP, 0).await.unwrap_err(),
        CartError::Unauthorized
    );
    assert_eq!(
        shop.cart.clear_cart(None).await.unwrap_err(),
        CartError::Unauthorized
    );
    assert_eq!(shop.store.calls(), 0);
}
