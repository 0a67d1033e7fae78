use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use eshop_catalog::{
    app::catalog::{
        model::UpdateCount, CatalogService, InMemoryProductRepository, Product,
        ProductRepository, Storage, StorageError,
    },
    config::AppConfig,
    create_app, AppState,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use std::sync::Arc;

fn server_with(storage: Storage, config: &AppConfig) -> TestServer {
    let state = AppState::new(CatalogService::new(storage));
    TestServer::new(create_app(state, config)).unwrap()
}

fn seeded(products: Vec<Product>) -> (TestServer, Arc<InMemoryProductRepository>) {
    let repo = Arc::new(InMemoryProductRepository::with_products(products));
    let server = server_with(Storage::Available(repo.clone()), &AppConfig::default());
    (server, repo)
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

/// 所有操作都失败的存储
struct BrokenRepository {
    update: Option<UpdateCount>,
}

#[async_trait]
impl ProductRepository for BrokenRepository {
    async fn search_by_name_prefix(&self, _term: Option<&str>) -> Result<Vec<Product>, StorageError> {
        Err(StorageError::Unavailable("socket closed".to_string()))
    }

    async fn increment_likes(&self, _id: ObjectId) -> Result<UpdateCount, StorageError> {
        self.update
            .ok_or_else(|| StorageError::Unavailable("socket closed".to_string()))
    }

    async fn find_by_id(&self, _id: ObjectId) -> Result<Option<Product>, StorageError> {
        Err(StorageError::Unavailable("socket closed".to_string()))
    }

    async fn most_liked(&self, _limit: i64) -> Result<Vec<Product>, StorageError> {
        Err(StorageError::Unavailable("socket closed".to_string()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("socket closed".to_string()))
    }
}

#[tokio::test]
async fn test_search_example() {
    let (server, _) = seeded(vec![
        Product::new("A", 10.0).with_likes(2),
        Product::new("B", 20.0).with_likes(5),
    ]);

    let response = server.get("/search").add_query_param("query", "").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json::<Value>()), vec!["B", "A"]);

    let response = server.get("/search").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json::<Value>()), vec!["B", "A"]);
}

#[tokio::test]
async fn test_search_prefix_case_insensitive() {
    let (server, _) = seeded(vec![
        Product::new("Wooden Table", 120.0),
        Product::new("wool socks", 8.0),
        Product::new("Lamp of Wood", 45.0),
        Product::new("WOOFER", 60.0),
    ]);

    let response = server.get("/search").add_query_param("query", "woo").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(names(&body), vec!["Wooden Table", "WOOFER", "wool socks"]);
    let prices: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"].as_f64().unwrap())
        .collect();
    assert!(prices.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_search_serializes_id_as_string() {
    let product = Product::new("Mug", 9.5)
        .with_field("description", "Ceramic")
        .with_field("image", "/static/img/mug.png");
    let id = product.id.to_hex();
    let (server, _) = seeded(vec![product]);

    let body = server.get("/search").await.json::<Value>();
    assert_eq!(body[0]["_id"], json!(id));
    assert_eq!(body[0]["description"], "Ceramic");
    assert_eq!(body[0]["image"], "/static/img/mug.png");
    assert!(body[0].get("likes").is_none());
}

#[tokio::test]
async fn test_search_keeps_unknown_fields() {
    let product = Product::new("Lamp", 10.0)
        .with_field("category", "lamps")
        .with_field("stock", 3_i32)
        .with_field("likes", 2.0);
    let (server, _) = seeded(vec![product]);

    let body = server.get("/search").add_query_param("query", "la").await.json::<Value>();
    assert_eq!(body[0]["category"], "lamps");
    assert_eq!(body[0]["stock"], 3);
    assert_eq!(body[0]["likes"], 2.0);
}

#[tokio::test]
async fn test_search_products_without_name_or_price() {
    let mut bare = Product::new("", 0.0);
    bare.fields.clear();
    let (server, _) = seeded(vec![bare, Product::new("Lamp", 10.0)]);

    let response = server.get("/search").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "Lamp");
    assert!(body[1].get("name").is_none());

    let response = server.get("/search").add_query_param("query", "l").await;
    assert_eq!(names(&response.json::<Value>()), vec!["Lamp"]);
}

#[tokio::test]
async fn test_search_repeated_query_uses_first() {
    let (server, _) = seeded(vec![
        Product::new("Lamp", 10.0),
        Product::new("Zebra rug", 50.0),
    ]);

    let response = server.get("/search?query=la&query=ze").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json::<Value>()), vec!["Lamp"]);
}

#[tokio::test]
async fn test_like_increments_and_returns_new_count() {
    let product = Product::new("A", 10.0).with_likes(2);
    let id = product.id;
    let (server, repo) = seeded(vec![product]);

    for expected in [3, 4] {
        let response = server
            .post("/like")
            .json(&json!({ "product_id": id.to_hex() }))
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        assert_eq!(body["message"], "Like registered successfully");
        assert_eq!(body["product_id"], id.to_hex());
        assert_eq!(body["new_likes"], expected);
    }

    assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().likes(), Some(4));
}

#[tokio::test]
async fn test_like_missing_product_id() {
    let (server, _) = seeded(vec![]);

    let response = server.post("/like").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Missing 'product_id' in request body"
    );

    let response = server.post("/like").text("product_id=1").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_invalid_id() {
    let product = Product::new("A", 1.0).with_likes(7);
    let (server, repo) = seeded(vec![product.clone()]);

    for id in [json!("12345"), json!(12345), json!({ "$oid": "x" })] {
        let response = server.post("/like").json(&json!({ "product_id": id })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "Invalid product ID format");
    }

    assert_eq!(repo.snapshot().await, vec![product]);
}

#[tokio::test]
async fn test_like_unknown_product() {
    let product = Product::new("A", 1.0);
    let (server, repo) = seeded(vec![product.clone()]);

    let response = server
        .post("/like")
        .json(&json!({ "product_id": ObjectId::new().to_hex() }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "Product not found");
    assert_eq!(repo.snapshot().await, vec![product]);
}

#[tokio::test]
async fn test_popular_products() {
    let (server, _) = seeded(
        (1..=7)
            .map(|i| Product::new(format!("p{}", i), 1.0).with_likes(i * 10))
            .chain([Product::new("unliked", 1.0)])
            .collect(),
    );

    let response = server.get("/popular-products").await;
    response.assert_status_ok();
    assert_eq!(
        names(&response.json::<Value>()),
        vec!["p7", "p6", "p5", "p4", "p3"]
    );
}

#[tokio::test]
async fn test_popular_with_few_products() {
    let (server, _) = seeded(vec![
        Product::new("A", 10.0).with_likes(2),
        Product::new("B", 20.0).with_likes(5),
    ]);

    let body = server.get("/popular-products").await.json::<Value>();
    assert_eq!(names(&body), vec!["B", "A"]);
}

#[tokio::test]
async fn test_unavailable_storage() {
    let server = server_with(
        Storage::unavailable("MONGO_URI not set"),
        &AppConfig::default(),
    );

    for response in [
        server.get("/search").await,
        server.get("/popular-products").await,
        server.post("/like").json(&json!({})).await,
    ] {
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["error"], "Database connection failed");
    }

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["database"], "unavailable");
}

#[tokio::test]
async fn test_storage_failure_hides_details() {
    let server = server_with(
        Storage::available(BrokenRepository { update: None }),
        &AppConfig::default(),
    );

    let response = server.get("/search").add_query_param("query", "x").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"],
        "An error occurred during search"
    );

    let response = server
        .post("/like")
        .json(&json!({ "product_id": ObjectId::new().to_hex() }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"],
        "An error occurred while liking the product"
    );

    let response = server.get("/popular-products").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("socket closed"));

    assert_eq!(
        server.get("/health").await.json::<Value>()["database"],
        "unreachable"
    );
}

#[tokio::test]
async fn test_like_matched_but_unmodified() {
    let server = server_with(
        Storage::available(BrokenRepository {
            update: Some(UpdateCount {
                matched: 1,
                modified: 0,
            }),
        }),
        &AppConfig::default(),
    );

    let id = ObjectId::new().to_hex();
    let response = server.post("/like").json(&json!({ "product_id": id })).await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["message"], "Like registered but count not modified");
    assert_eq!(body["product_id"], id);
    assert_eq!(body["new_likes"], Value::Null);
}

#[tokio::test]
async fn test_concurrent_likes() {
    let product = Product::new("A", 1.0);
    let id = product.id;
    let (server, repo) = seeded(vec![product]);

    let requests = (0..20).map(|_| async {
        server
            .post("/like")
            .json(&json!({ "product_id": id.to_hex() }))
            .await
            .status_code()
    });

    for status in futures::future::join_all(requests).await {
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().likes(), Some(20));
}

#[tokio::test]
async fn test_pages_are_served_without_database() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("homepage.html"), "<h1>home</h1>").unwrap();
    std::fs::write(dir.path().join("products.html"), "<h1>products</h1>").unwrap();

    let mut config = AppConfig::default();
    config.web.templates_dir = dir.path().to_path_buf();
    let server = server_with(Storage::unavailable("down"), &config);

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "<h1>home</h1>");

    let response = server.get("/products").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "<h1>products</h1>");
}

#[tokio::test]
async fn test_request_id_header() {
    let (server, _) = seeded(vec![]);

    let response = server.get("/search").await;
    let request_id = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
}

#[test]
fn test_example_config_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let config = AppConfig::load_from_file(path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.database.database, "Eshop");
}
