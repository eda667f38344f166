//! Database flows. Run with `DATABASE_URL` pointing at a scratch server:
//! `cargo test -- --ignored`.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::domain::aggregates::{CartIdentity, OrderStatus, PaymentStatus, ProductDraft, ShippingAddress};
use storefront::domain::events::EventPublisher;
use storefront::domain::value_objects::SizeStock;
use storefront::identity::Identity;
use storefront::payment::SandboxGateway;
use storefront::services::cart::{self, AddItem};
use storefront::services::reviews::ReviewInput;
use storefront::services::{catalog, checkout, orders, reviews};
use storefront::{AppState, StorefrontError};

fn state(pool: PgPool, gateway: Arc<SandboxGateway>) -> AppState {
    let config = AppConfig::with_defaults("postgres://unused", "sk_test_unused", "test-secret");
    AppState::new(pool, config, gateway, EventPublisher::disabled())
}

async fn seed_product(state: &AppState, price: Decimal, sizes: &[(&str, i64)]) -> (Uuid, String) {
    let category = catalog::create_category(state, "Tênis", None).await.unwrap();
    let draft = ProductDraft {
        category_id: category.id,
        name: "Tênis Corrida".into(),
        description: "Leve e confortável".into(),
        short_description: None,
        price,
        old_price: None,
        brand: Some("Passo".into()),
        image_urls: vec!["https://cdn.example.com/tenis.jpg".into()],
        stock: 10,
        size_stock: SizeStock::from_entries(sizes.iter().map(|(s, q)| (s.to_string(), *q))).unwrap(),
        sizes: sizes.iter().map(|(s, _)| s.to_string()).collect(),
        colors: vec![],
        is_active: true,
        is_featured: false,
        is_new: true,
    };
    let product = catalog::create_product(state, &draft).await.unwrap();
    (product.id, product.slug)
}

fn item(product_id: Uuid, quantity: i32, size: &str) -> AddItem {
    AddItem { product_id, quantity, size: Some(size.into()), color: None }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Ana Souza".into(),
        address: "Rua das Flores, 10".into(),
        city: "Recife".into(),
        state: "PE".into(),
        zip: "50000-000".into(),
    }
}

fn user(user_id: Uuid, is_admin: bool) -> Identity {
    Identity { user_id: Some(user_id), is_admin, session: None }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_stock_ceiling_and_line_removal(pool: PgPool) {
    let state = state(pool, Arc::new(SandboxGateway::new()));
    let (product_id, _) = seed_product(&state, Decimal::new(5000, 2), &[("M", 2)]).await;
    let owner = CartIdentity::Session(state.sessions.issue());

    let summary = cart::add_item(&state, &owner, item(product_id, 2, "M")).await.unwrap();
    assert_eq!(summary.totals.total_items, 2);
    let line_id = summary.items[0].line.id;

    let err = cart::add_item(&state, &owner, item(product_id, 1, "M")).await.unwrap_err();
    assert!(matches!(err, StorefrontError::Stock { remaining: 0 }));
    assert_eq!(cart::get_cart(&state, &owner).await.unwrap().totals.total_items, 2);

    let summary = cart::update_item(&state, &owner, line_id, 0).await.unwrap();
    assert_eq!(summary.totals.total_items, 0);
    assert!(summary.items.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_checkout_totals_agree(pool: PgPool) {
    let gateway = Arc::new(SandboxGateway::new());
    let state = state(pool, gateway.clone());
    let (product_id, _) = seed_product(&state, Decimal::new(5000, 2), &[("M", 5)]).await;
    let user_id = Uuid::new_v4();
    let owner = CartIdentity::User(user_id);

    let summary = cart::add_item(&state, &owner, item(product_id, 2, "M")).await.unwrap();
    assert_eq!(summary.totals.total, Decimal::new(11590, 2));

    let intent = checkout::create_payment_intent(&state, user_id).await.unwrap();
    assert_eq!(intent.amount, 11590);

    let err = checkout::finalize_checkout(&state, user_id, &intent.payment_intent_id, &address()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::Payment(_)));
    assert_eq!(cart::get_cart(&state, &owner).await.unwrap().totals.total_items, 2);

    assert!(gateway.confirm(&intent.payment_intent_id));
    let order = checkout::finalize_checkout(&state, user_id, &intent.payment_intent_id, &address()).await.unwrap();
    assert_eq!(order.total_amount, summary.totals.total);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(cart::get_cart(&state, &owner).await.unwrap().items.is_empty());

    let detail = orders::get_order(&state, &user(user_id, false), order.id).await.unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].size.as_deref(), Some("M"));

    let stranger = orders::get_order(&state, &user(Uuid::new_v4(), false), order.id).await;
    assert!(matches!(stranger, Err(StorefrontError::Auth(_))));

    let replay = checkout::finalize_checkout(&state, user_id, &intent.payment_intent_id, &address()).await;
    assert!(matches!(replay, Err(StorefrontError::Business(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_cart_change_after_intent_is_refused(pool: PgPool) {
    let gateway = Arc::new(SandboxGateway::new());
    let state = state(pool, gateway.clone());
    let (product_id, _) = seed_product(&state, Decimal::new(5000, 2), &[("M", 5)]).await;
    let user_id = Uuid::new_v4();
    let owner = CartIdentity::User(user_id);

    cart::add_item(&state, &owner, item(product_id, 1, "M")).await.unwrap();
    let intent = checkout::create_payment_intent(&state, user_id).await.unwrap();
    gateway.confirm(&intent.payment_intent_id);
    cart::add_item(&state, &owner, item(product_id, 1, "M")).await.unwrap();

    let err = checkout::finalize_checkout(&state, user_id, &intent.payment_intent_id, &address()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::Payment(_)));
    assert_eq!(cart::get_cart(&state, &owner).await.unwrap().totals.total_items, 2);
    assert!(orders::list_for_user(&state, user_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_failed_order_write_rolls_back_everything(pool: PgPool) {
    sqlx::query(
        "CREATE FUNCTION reject_order_items() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'order items unavailable'; END; $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("CREATE TRIGGER reject_order_items BEFORE INSERT ON order_items FOR EACH ROW EXECUTE FUNCTION reject_order_items()")
        .execute(&pool)
        .await
        .unwrap();

    let gateway = Arc::new(SandboxGateway::new());
    let state = state(pool.clone(), gateway.clone());
    let (product_id, _) = seed_product(&state, Decimal::new(5000, 2), &[("M", 5)]).await;
    let user_id = Uuid::new_v4();
    let owner = CartIdentity::User(user_id);

    cart::add_item(&state, &owner, item(product_id, 2, "M")).await.unwrap();
    let intent = checkout::create_payment_intent(&state, user_id).await.unwrap();
    gateway.confirm(&intent.payment_intent_id);

    let err = checkout::finalize_checkout(&state, user_id, &intent.payment_intent_id, &address()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::Payment(_)));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(&pool).await.unwrap();
    assert_eq!(orders, 0);
    assert_eq!(cart::get_cart(&state, &owner).await.unwrap().totals.total_items, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_anonymous_cart_read_does_not_persist(pool: PgPool) {
    let state = state(pool.clone(), Arc::new(SandboxGateway::new()));
    let (product_id, _) = seed_product(&state, Decimal::new(5000, 2), &[("M", 5)]).await;
    let owner = CartIdentity::Session(state.sessions.issue());

    let summary = cart::get_cart(&state, &owner).await.unwrap();
    assert_eq!(summary.cart_id, None);
    assert!(summary.items.is_empty());
    let carts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts").fetch_one(&pool).await.unwrap();
    assert_eq!(carts, 0);

    let added = cart::add_item(&state, &owner, item(product_id, 1, "M")).await.unwrap();
    assert_eq!(cart::get_cart(&state, &owner).await.unwrap().cart_id, added.cart_id);
    let carts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts").fetch_one(&pool).await.unwrap();
    assert_eq!(carts, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_editing_a_review_recomputes_rating(pool: PgPool) {
    let state = state(pool, Arc::new(SandboxGateway::new()));
    let (product_id, slug) = seed_product(&state, Decimal::new(5000, 2), &[]).await;
    let (ana, bruno) = (Uuid::new_v4(), Uuid::new_v4());

    let review = reviews::submit(&state, ana, product_id, ReviewInput::new(5, None, "Perfeito").unwrap()).await.unwrap();
    reviews::submit(&state, bruno, product_id, ReviewInput::new(4, None, "Bom").unwrap()).await.unwrap();
    let detail = catalog::product_detail(&state, &slug).await.unwrap();
    assert_eq!(detail.average_rating, Decimal::new(45, 1));

    let edited = reviews::edit(&state, &user(ana, false), review.id, ReviewInput::new(1, Some("Rasgou"), "Durou pouco").unwrap())
        .await
        .unwrap();
    assert_eq!(edited.rating, 1);
    assert_eq!(edited.title.as_deref(), Some("Rasgou"));

    let detail = catalog::product_detail(&state, &slug).await.unwrap();
    assert_eq!(detail.average_rating, Decimal::new(25, 1));
    assert_eq!(detail.review_count, 2);
    assert_eq!(detail.rating_distribution, [1, 0, 0, 1, 0]);

    let stranger = reviews::edit(&state, &user(bruno, false), review.id, ReviewInput::new(5, None, "Mudei").unwrap()).await;
    assert!(matches!(stranger, Err(StorefrontError::Auth(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_review_lifecycle_keeps_rating_in_sync(pool: PgPool) {
    let state = state(pool, Arc::new(SandboxGateway::new()));
    let (product_id, slug) = seed_product(&state, Decimal::new(5000, 2), &[]).await;
    let (ana, bruno, admin) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let first = reviews::submit(&state, ana, product_id, ReviewInput::new(4, Some("Bom"), "Confortável").unwrap()).await.unwrap();
    let second = reviews::submit(&state, bruno, product_id, ReviewInput::new(2, None, "Apertado").unwrap()).await.unwrap();
    let detail = catalog::product_detail(&state, &slug).await.unwrap();
    assert_eq!(detail.average_rating, Decimal::new(30, 1));
    assert_eq!(detail.review_count, 2);
    assert_eq!(detail.rating_distribution, [0, 1, 0, 1, 0]);

    let duplicate = reviews::submit(&state, ana, product_id, ReviewInput::new(5, None, "De novo").unwrap()).await;
    assert!(matches!(duplicate, Err(StorefrontError::Business(_))));

    reviews::moderate(&state, &user(admin, true), second.id, false).await.unwrap();
    let detail = catalog::product_detail(&state, &slug).await.unwrap();
    assert_eq!(detail.average_rating, Decimal::new(40, 1));
    assert_eq!(detail.review_count, 1);

    assert_eq!(reviews::mark_helpful(&state, bruno, first.id).await.unwrap(), 1);
    let again = reviews::mark_helpful(&state, bruno, first.id).await;
    assert!(matches!(again, Err(StorefrontError::Business(_))));

    let not_owner = reviews::delete(&state, &user(bruno, false), first.id).await;
    assert!(matches!(not_owner, Err(StorefrontError::Auth(_))));
    reviews::delete(&state, &user(ana, false), first.id).await.unwrap();
    let detail = catalog::product_detail(&state, &slug).await.unwrap();
    assert_eq!(detail.average_rating, Decimal::ZERO);
    assert_eq!(detail.review_count, 0);
}
