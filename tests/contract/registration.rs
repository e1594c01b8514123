//! Registration: route sources, prefix composition and construction errors.

use std::collections::BTreeMap;

use hyper::StatusCode;
use waypoint::response;
use waypoint::{
    Error, Group, Meta, Method, Module, PatternError, Route, Router, RouterOptions, Routes, prefixed,
};

use super::{body_string, request};

fn tagged(meta: Meta, tag: &'static str) -> Route {
    Route::new(meta, move |_req| async move {
        Ok(response::text(StatusCode::OK, tag))
    })
}

#[tokio::test]
async fn duplicate_patterns_resolve_to_first_registration() {
    let router = Router::new(
        vec![
            tagged(Meta::get("/users/:id"), "first"),
            tagged(Meta::get("/users/:user_id/"), "second"),
        ],
        RouterOptions::default(),
    )
    .unwrap();

    assert_eq!(router.len(), 2);
    let resp = router.dispatch(request(Method::GET, "/users/1")).await;
    assert_eq!(body_string(resp).await, "first");
}

#[tokio::test]
async fn keyed_routes_register_in_iteration_order() {
    let routes: Routes = vec![
        ("later-key", tagged(Meta::get("/dup"), "inserted-first")),
        ("earlier-key", tagged(Meta::get("/dup"), "inserted-second")),
    ]
    .into_iter()
    .collect();
    let router = Router::new(routes, RouterOptions::default()).unwrap();
    let resp = router.dispatch(request(Method::GET, "/dup")).await;
    assert_eq!(body_string(resp).await, "inserted-first");

    let mut map = BTreeMap::new();
    map.insert("b", tagged(Meta::get("/dup"), "key-b"));
    map.insert("a", tagged(Meta::get("/dup"), "key-a"));
    let router = Router::new(map, RouterOptions::default()).unwrap();
    let resp = router.dispatch(request(Method::GET, "/dup")).await;
    assert_eq!(body_string(resp).await, "key-a");
}

#[tokio::test]
async fn groups_compose_prefixes() {
    let api = Group::new("/api");
    let v1 = api.group("/v1");

    let routes = vec![
        v1.route(Meta::get("/users/:id"), |req| async move {
            Ok::<_, Error>(response::text(
                StatusCode::OK,
                format!("user {}", req.require_param("id")?),
            ))
        }),
        Route::new(prefixed("/api", Meta::get("/health")), |_req| async {
            Ok(response::text(StatusCode::OK, "healthy"))
        }),
    ];
    let router = Router::new(routes, RouterOptions::default()).unwrap();

    let resp = router.dispatch(request(Method::GET, "/api/v1/users/7")).await;
    assert_eq!(body_string(resp).await, "user 7");
    let resp = router.dispatch(request(Method::GET, "/api/health")).await;
    assert_eq!(body_string(resp).await, "healthy");
    let resp = router.dispatch(request(Method::GET, "/v1/users/7")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

struct Files;

impl Module for Files {
    fn name(&self) -> &'static str {
        "files"
    }

    fn prefix(&self) -> &str {
        "/files"
    }

    fn routes(&self) -> Vec<Route> {
        vec![Route::new(Meta::get("/*path"), |req| async move {
            Ok::<_, Error>(response::text(
                StatusCode::OK,
                req.require_param("path")?.to_string(),
            ))
        })]
    }
}

#[tokio::test]
async fn modules_mount_under_their_prefix() {
    let routes = waypoint::module::collect(&[&Files]);
    let router = Router::new(routes, RouterOptions::default()).unwrap();

    let resp = router
        .dispatch(request(Method::GET, "/files/docs/readme%20first.md"))
        .await;
    assert_eq!(body_string(resp).await, "docs/readme first.md");
}

#[test]
fn missing_path_is_a_configuration_error() {
    let err = Router::new(
        vec![tagged(Meta::get("/ok"), "ok"), tagged(Meta::new(), "no path")],
        RouterOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingPath { index: 1 }));
    assert_eq!(err.to_string(), "Route #1 has no path");
}

#[test]
fn malformed_patterns_abort_construction() {
    let cases = [
        "/files/*rest/meta",
        "/*a/*b",
        "/users/:id/posts/:id",
        "/users/:",
    ];
    for path in cases {
        let err = Router::new(vec![tagged(Meta::get(path), "bad")], RouterOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Pattern(_)), "{path}: {err}");
    }

    let err = Router::new(vec![tagged(Meta::get("/*a/*b"), "bad")], RouterOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Pattern(PatternError::MultipleWildcards { .. })
    ));
}
