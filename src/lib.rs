//! Waypoint - HTTP request router with trie matching and contained faults.
//!
//! Waypoint takes a list of routes, each a handler tagged with methods and a
//! path pattern, and dispatches every request to the single best match:
//!
//! - **Pattern**: `/users/:id/files/*rest` compiled into literal, parameter
//!   and wildcard segments
//! - **Table**: the default [`Matcher`]; per-method tries with literal > parameter > wildcard precedence
//!   and an ANY-method fallback group
//! - **Router**: dispatch with not-found and error fallbacks; handler errors
//!   and panics never escape
//! - **Route**: handler metadata, registration normalization, prefix groups
//! - **Config**: Layered configuration (file → env → CLI)
//! - **Server**: Hyper-based HTTP server that hosts a router
//!
//! # Example
//!
//! ```ignore
//! use waypoint::{ConfigLoader, Group, Meta, Route, Router, RouterOptions};
//!
//! #[tokio::main]
//! async fn main() -> waypoint::Result<()> {
//!     let config = ConfigLoader::new("MYAPP").load(None, None, None, None)?;
//!
//!     let api = Group::new("/api");
//!     let routes = vec![
//!         api.route(Meta::get("/users/:id"), |req| async move {
//!             waypoint::response::ok(&serde_json::json!({ "id": req.require_param("id")? }))
//!         }),
//!         Route::new(Meta::any("/files/*path"), |req| async move {
//!             waypoint::response::ok(&serde_json::json!({ "path": req.param("path") }))
//!         }),
//!     ];
//!
//!     let router = Router::new(routes, RouterOptions::from(&config.routing))?;
//!     waypoint::server::run(config, router.into_handle()).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod module;
pub mod pattern;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod table;

// Re-export main types at crate root
pub use config::{Config, ConfigLoader};
pub use error::{Error, Fault, Result};
pub use module::Module;
pub use pattern::{Pattern, PatternError, Segment};
pub use route::{Group, Meta, Route, Routes, normalize, prefixed};
pub use router::{Request, Router, RouterOptions, create_router};
pub use table::{Match, Matcher, Params, Table};

// Re-export commonly used dependencies for convenience
pub use hyper::Method;
pub use serde_json::json;
