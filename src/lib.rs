//! In-memory post store served as a JSON API over iron.
//!
//! Posts live only as long as the process does.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod repository;

use std::sync::{Arc, Mutex};

use iron::prelude::Chain;
use logger::Logger;
use router::Router;

pub use crate::config::{Config, ConfigError};
pub use crate::error::{RepoError, RepoResult};
pub use crate::handlers::{CorsAfterMiddleware, Handlers, JsonAfterMiddleware, PreflightHandler};
pub use crate::model::{Post, PostId, PostPatch};
pub use crate::repository::{PostRepository, SortDirection, SortKey};

/// Build the complete request chain around `repository`.
pub fn build_chain(repository: PostRepository) -> Chain {
    build_shared_chain(Arc::new(Mutex::new(repository)))
}

/// Like `build_chain`, for callers that keep their own handle on the repository.
pub fn build_shared_chain(repository: Arc<Mutex<PostRepository>>) -> Chain {
    let (logger_before, logger_after) = Logger::new(None);
    let handlers = Handlers::shared(repository);

    let mut router = Router::new();
    router.get("/api/posts", handlers.list, "list_posts");
    router.get("/api/posts/search", handlers.search, "search_posts");
    router.post("/api/posts", handlers.create, "create_post");
    router.put("/api/posts/:id", handlers.update, "update_post");
    router.delete("/api/posts/:id", handlers.delete, "delete_post");
    router.options("/api/posts", PreflightHandler, "preflight_posts");
    router.options("/api/posts/:id", PreflightHandler, "preflight_post");

    let mut chain = Chain::new(router);
    chain.link_before(logger_before); // Should be first!
    chain.link_after(JsonAfterMiddleware);
    chain.link_after(CorsAfterMiddleware);
    chain.link_after(logger_after); // Should be last!
    chain
}
