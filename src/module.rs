//! Module trait for pluggable API modules.
//!
//! Modules implement the `Module` trait to contribute their routes to a
//! router, optionally mounted under a shared prefix.
//!
//! # Example
//!
//! ```ignore
//! use waypoint::{Meta, Module, Route};
//!
//! pub struct HealthModule;
//!
//! impl Module for HealthModule {
//!     fn name(&self) -> &'static str {
//!         "health"
//!     }
//!
//!     fn routes(&self) -> Vec<Route> {
//!         vec![Route::new(Meta::get("/health"), |_req| async move {
//!             waypoint::response::ok(&serde_json::json!({ "status": "ok" }))
//!         })]
//!     }
//! }
//! ```

use tracing::debug;

use crate::route::{Group, Route, Routes};

/// A pluggable API module.
///
/// State is captured in the handler closures, typically behind an `Arc`.
pub trait Module: Send + Sync {
    /// Module name for identification and logging.
    fn name(&self) -> &'static str;

    /// Prefix every route of this module is mounted under.
    fn prefix(&self) -> &str {
        ""
    }

    /// The module's routes, relative to [`Module::prefix`].
    fn routes(&self) -> Vec<Route>;
}

/// Collect the routes of several modules, in module order.
pub fn collect(modules: &[&dyn Module]) -> Routes {
    let mut routes = Routes::new();
    for module in modules {
        let own = Group::new(module.prefix()).mount(module.routes());
        debug!(module = module.name(), routes = own.len(), "Module routes collected");
        routes.extend(own);
    }
    routes
}
