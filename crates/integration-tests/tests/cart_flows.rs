//! Cart mutation scenarios: invariants over add/remove/update sequences.

use rust_decimal::Decimal;

use abshine_core::ProductId;
use abshine_integration_tests::TestHarness;

fn p(id: &str) -> ProductId {
    ProductId::new(id)
}

#[tokio::test]
async fn repeated_adds_keep_one_line_with_quantity_equal_to_call_count() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    for _ in 0..7 {
        storefront.add_to_cart(&p("p2")).expect("known product");
    }

    assert_eq!(storefront.cart().len(), 1);
    assert_eq!(storefront.cart().line(&p("p2")).expect("line exists").quantity, 7);
    assert_eq!(storefront.cart_item_count(), 7);
}

#[tokio::test]
async fn price_scenario_from_one_product_catalog() {
    // catalog = {"p1": {price: 100}}
    let harness = TestHarness::new();
    harness.seed_product("p1", "Limpiador multiuso", 100);
    let mut storefront = harness.build_ready().await;

    storefront.add_to_cart(&p("p1")).expect("known product");
    assert_eq!(storefront.cart().len(), 1);
    assert_eq!(storefront.cart_total(), Decimal::from(100));

    storefront.add_to_cart(&p("p1")).expect("known product");
    assert_eq!(storefront.cart().line(&p("p1")).expect("line exists").quantity, 2);
    assert_eq!(storefront.cart_total(), Decimal::from(200));

    storefront.update_quantity(&p("p1"), 5);
    assert_eq!(storefront.cart_total(), Decimal::from(500));

    storefront.remove_from_cart(&p("p1"));
    assert!(storefront.cart().is_empty());
    assert_eq!(storefront.cart_total(), Decimal::ZERO);
}

#[tokio::test]
async fn update_to_zero_and_negative_both_remove_the_line() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    storefront.add_to_cart(&p("p1")).expect("known product");
    storefront.update_quantity(&p("p1"), 0);
    assert!(storefront.cart().line(&p("p1")).is_none());

    storefront.add_to_cart(&p("p1")).expect("known product");
    storefront.update_quantity(&p("p1"), -5);
    assert!(storefront.cart().line(&p("p1")).is_none());

    // Idempotent with an explicit remove
    storefront.remove_from_cart(&p("p1"));
    assert!(storefront.cart().is_empty());
}

#[tokio::test]
async fn removing_an_absent_line_is_a_silent_noop() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    storefront.add_to_cart(&p("p1")).expect("known product");
    storefront.remove_from_cart(&p("nunca-agregado"));

    assert_eq!(storefront.cart().len(), 1);
}

#[tokio::test]
async fn total_equals_recomputation_after_any_mutation_sequence() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    storefront.add_to_cart(&p("p1")).expect("known product");
    storefront.add_to_cart(&p("p2")).expect("known product");
    storefront.add_to_cart(&p("p3")).expect("known product");
    storefront.update_quantity(&p("p1"), 4);
    storefront.remove_from_cart(&p("p2"));
    storefront.add_to_cart(&p("p2")).expect("known product");
    storefront.update_quantity(&p("p3"), 2);

    let recomputed: Decimal = storefront
        .cart()
        .lines()
        .iter()
        .map(|line| line.price.amount() * Decimal::from(line.quantity))
        .sum();
    assert_eq!(storefront.cart_total(), recomputed);
    assert_eq!(
        storefront.cart_total(),
        Decimal::from(4 * 100 + 250 + 2 * 650)
    );
}

#[tokio::test]
async fn insertion_order_is_stable_for_display() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    storefront.add_to_cart(&p("p3")).expect("known product");
    storefront.add_to_cart(&p("p1")).expect("known product");
    storefront.add_to_cart(&p("p2")).expect("known product");
    storefront.add_to_cart(&p("p3")).expect("known product");

    let order: Vec<&str> = storefront
        .cart()
        .lines()
        .iter()
        .map(|line| line.product_id.as_str())
        .collect();
    assert_eq!(order, vec!["p3", "p1", "p2"]);

    let view = storefront.view();
    let view_order: Vec<&str> = view
        .cart
        .lines
        .iter()
        .map(|line| line.product_id.as_str())
        .collect();
    assert_eq!(view_order, vec!["p3", "p1", "p2"]);
}

#[tokio::test]
async fn badge_visibility_follows_item_count() {
    let harness = TestHarness::with_demo_catalog();
    let mut storefront = harness.build_ready().await;

    assert!(!storefront.view().cart.badge_visible);

    storefront.add_to_cart(&p("p1")).expect("known product");
    let view = storefront.view();
    assert!(view.cart.badge_visible);
    assert_eq!(view.cart.item_count, 1);

    storefront.remove_from_cart(&p("p1"));
    assert!(!storefront.view().cart.badge_visible);
}
