mod common;

use common::text;
use oxide_dispatch::{RouteDef, RouteRegistrar, Router, RouterError, UrlParams};

fn router() -> Router {
    let mut routes = RouteRegistrar::new();
    routes
        .add(RouteDef::get("/user/{id}/{name?}", text("profile")).name("user.profile"))
        .unwrap();
    routes
        .add(RouteDef::get("/archive/{year?}/{month?}", text("archive")).name("archive"))
        .unwrap();
    routes
        .add(RouteDef::get("/files/{path}", text("file")).name("files.show"))
        .unwrap();
    routes
        .add(
            RouteDef::get("/settings", text("settings"))
                .name("tenant.settings")
                .domain("{account}.example.com"),
        )
        .unwrap();
    routes.into_router().unwrap()
}

#[test]
fn test_optional_parameters() {
    let router = router();
    assert_eq!(
        router.url_for("user.profile", &UrlParams::from([("id", 1)])).unwrap(),
        "/user/1"
    );
    assert_eq!(
        router
            .url_for("user.profile", &UrlParams::new().with("id", 1).with("name", "john"))
            .unwrap(),
        "/user/1/john"
    );
}

#[test]
fn test_missing_required_parameter() {
    let err = router().url_for("user.profile", &UrlParams::new()).unwrap_err();
    assert!(matches!(
        err,
        RouterError::MissingUrlParameter { route, param }
            if route == "user.profile" && param == "id"
    ));
}

#[test]
fn test_optional_gap_is_rejected() {
    let router = router();
    assert_eq!(router.url_for("archive", &UrlParams::new()).unwrap(), "/archive");
    assert_eq!(
        router.url_for("archive", &UrlParams::from([("year", 2024)])).unwrap(),
        "/archive/2024"
    );
    assert!(matches!(
        router.url_for("archive", &UrlParams::from([("month", 5)])),
        Err(RouterError::MissingUrlParameter { param, .. }) if param == "year"
    ));
}

#[test]
fn test_extra_parameters_become_query() {
    let url = router()
        .url_for(
            "user.profile",
            &UrlParams::new()
                .with("id", 1)
                .with("tab", "posts")
                .with("q", "a b&c"),
        )
        .unwrap();
    assert_eq!(url, "/user/1?tab=posts&q=a%20b%26c");
}

#[test]
fn test_path_values_are_encoded() {
    let url = router()
        .url_for("files.show", &UrlParams::from([("path", "my report/v2.pdf")]))
        .unwrap();
    assert_eq!(url, "/files/my%20report%2Fv2.pdf");
}

#[test]
fn test_domain_route() {
    let router = router();
    assert_eq!(
        router
            .url_for("tenant.settings", &UrlParams::from([("account", "acme")]))
            .unwrap(),
        "//acme.example.com/settings"
    );
    assert!(matches!(
        router.url_for("tenant.settings", &UrlParams::new()),
        Err(RouterError::MissingUrlParameter { param, .. }) if param == "account"
    ));
}

#[test]
fn test_domain_value_must_be_a_host_label() {
    let router = router();
    for value in ["evil.com/x?", "a.b", "", "with space"] {
        assert!(
            matches!(
                router.url_for("tenant.settings", &UrlParams::from([("account", value)])),
                Err(RouterError::InvalidHostLabel { param, .. }) if param == "account"
            ),
            "expected {value:?} to be rejected"
        );
    }
}

#[test]
fn test_unknown_name() {
    assert!(matches!(
        router().url_for("nope", &UrlParams::new()),
        Err(RouterError::UnknownRouteName(_))
    ));
}
