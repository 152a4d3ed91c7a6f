//! Product catalog pages.

use axum::http::StatusCode;
use shopdesk_admin::db::CrudRepository;
use shopdesk_admin::models::{NewProduct, Product};
use shopdesk_admin::routes::products::{
    PRODUCT_CREATED, PRODUCT_DELETE_FAILED, PRODUCT_DELETED, PRODUCT_UPDATED,
};
use shopdesk_admin::validation::PRODUCT_FORM_INVALID;
use shopdesk_core::{Price, ProductId, Quantity};
use shopdesk_integration_tests::TestApp;

const LIST: &str = "/dashboard/products";

async fn seed_mug(app: &TestApp) -> Product {
    let new = NewProduct {
        title: "Enamel Mug".to_string(),
        description: "Holds coffee".to_string(),
        price: Price::parse("12.5").unwrap(),
        quantity: Quantity::new(4).unwrap(),
        image: String::new(),
    };
    let id = app.products.create(&new).await.unwrap().into_id().unwrap();
    app.products.get_by_id(id).await.unwrap().unwrap()
}

fn full_form<'a>(price: &'a str, intent: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("name", "Enamel Mug"),
        ("description", "Holds coffee"),
        ("price", price),
        ("quantity", "4"),
        ("image", ""),
        ("intent", intent),
    ]
}

#[tokio::test]
async fn list_shows_products_with_two_decimal_prices() {
    let app = TestApp::new();
    seed_mug(&app).await;

    let response = app.get(LIST, Some(&app.signed_in_cookie())).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Enamel Mug"));
    assert!(response.body.contains("12.50"));
}

#[tokio::test]
async fn empty_list_renders() {
    let app = TestApp::new();

    let response = app.get(LIST, Some(&app.signed_in_cookie())).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("No products yet."));
}

#[tokio::test]
async fn create_stores_product_and_flashes() {
    let app = TestApp::new();
    let cookie = app.signed_in_cookie();

    let response = app
        .post_form(
            "/dashboard/products/new",
            &[
                ("name", "Tote Bag"),
                ("description", "Canvas"),
                ("price", "20"),
                ("quantity", "10"),
            ],
            Some(&cookie),
        )
        .await;

    assert!(response.is_redirect_to(LIST));
    let products = app.products.snapshot().await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Tote Bag");
    assert_eq!(products[0].quantity.get(), 10);

    let list = app.get(LIST, Some(&response.next_cookie())).await;
    assert!(list.body.contains(PRODUCT_CREATED));
}

#[tokio::test]
async fn create_with_invalid_values_rerenders_form() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/dashboard/products/new",
            &[("name", ""), ("description", "Canvas"), ("price", "-1"), ("quantity", "x")],
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains(PRODUCT_FORM_INVALID));
    assert!(response.body.contains("Canvas"));
    assert!(app.products.snapshot().await.is_empty());
}

#[tokio::test]
async fn edit_page_prefills_values() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .get(&format!("{LIST}/{}", mug.id), Some(&app.signed_in_cookie()))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Enamel Mug"));
    assert!(response.body.contains("Holds coffee"));
}

#[tokio::test]
async fn edit_page_for_malformed_id_is_not_found() {
    let app = TestApp::new();

    let response = app
        .get(&format!("{LIST}/not-a-uuid"), Some(&app.signed_in_cookie()))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updating_only_the_price_keeps_other_fields() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;
    let cookie = app.signed_in_cookie();

    let response = app
        .post_form(
            &format!("{LIST}/{}", mug.id),
            &full_form("15", "save"),
            Some(&cookie),
        )
        .await;

    assert!(response.is_redirect_to(LIST));
    let stored = app.products.get_by_id(mug.id).await.unwrap().unwrap();
    assert_eq!(stored.price, Price::parse("15").unwrap());
    assert_eq!(stored.title, mug.title);
    assert_eq!(stored.quantity, mug.quantity);
    assert_eq!(stored.created_at, mug.created_at);

    let list = app.get(LIST, Some(&response.next_cookie())).await;
    assert!(list.body.contains(PRODUCT_UPDATED));
}

#[tokio::test]
async fn missing_intent_saves() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .post_form(
            &format!("{LIST}/{}", mug.id),
            &[
                ("name", "Big Mug"),
                ("description", "Holds coffee"),
                ("price", "12.5"),
                ("quantity", "4"),
            ],
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert!(response.is_redirect_to(LIST));
    let stored = app.products.get_by_id(mug.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Big Mug");
}

#[tokio::test]
async fn invalid_update_keeps_stored_values() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .post_form(
            &format!("{LIST}/{}", mug.id),
            &full_form("abc", "save"),
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.set_cookie().is_some());
    assert!(response.body.contains(PRODUCT_FORM_INVALID));
    let stored = app.products.get_by_id(mug.id).await.unwrap().unwrap();
    assert_eq!(stored, mug);
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let app = TestApp::new();

    let response = app
        .post_form(
            &format!("{LIST}/{}", ProductId::generate()),
            &full_form("15", "save"),
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_intent_is_bad_request() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .post_form(
            &format!("{LIST}/{}", mug.id),
            &full_form("15", "archive"),
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.products.get_by_id(mug.id).await.unwrap().unwrap(), mug);
}

#[tokio::test]
async fn delete_removes_product_and_toast_shows_once() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .post_form(
            &format!("{LIST}/{}", mug.id),
            &[("intent", "delete")],
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert!(response.is_redirect_to(LIST));
    assert!(app.products.snapshot().await.is_empty());

    let first = app.get(LIST, Some(&response.next_cookie())).await;
    assert!(first.body.contains(PRODUCT_DELETED));
    let second = app.get(LIST, Some(&first.next_cookie())).await;
    assert!(!second.body.contains(PRODUCT_DELETED));
}

#[tokio::test]
async fn delete_of_missing_product_shows_failure_without_redirect() {
    let app = TestApp::new();
    let mug = seed_mug(&app).await;

    let response = app
        .post_form(
            &format!("{LIST}/{}", ProductId::generate()),
            &[("intent", "delete")],
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.location().is_none());
    assert!(response.body.contains(PRODUCT_DELETE_FAILED));
    assert_eq!(app.products.snapshot().await, vec![mug]);
}

#[tokio::test]
async fn delete_with_malformed_id_shows_failure() {
    let app = TestApp::new();

    let response = app
        .post_form(
            &format!("{LIST}/42"),
            &[("intent", "delete")],
            Some(&app.signed_in_cookie()),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains(PRODUCT_DELETE_FAILED));
}
