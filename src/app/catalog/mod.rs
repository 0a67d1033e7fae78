//! 商品目录：搜索、点赞、热门商品

pub mod handler;
pub mod memory;
pub mod model;
pub mod mongo;
pub mod repository;
pub mod service;

pub use handler::AppState;
pub use memory::InMemoryProductRepository;
pub use model::{LikeResponse, Product};
pub use mongo::MongoProductRepository;
pub use repository::{ProductRepository, Storage, StorageError};
pub use service::CatalogService;
