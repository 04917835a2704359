use ::http::Method;

use crate::http::router::Router;
use crate::kernel::error::Result;

#[test]
fn test_image_route_with_extension() -> Result<()> {
    let router = Router::new()?;
    let route = router.route(&Method::GET, "/users/christer/images/a1b2c3.png")?;

    assert_eq!(route.name(), "image");
    assert_eq!(route.get("user"), Some("christer"));
    assert_eq!(route.get("imageIdentifier"), Some("a1b2c3"));
    assert_eq!(route.get("extension"), Some("png"));
    Ok(())
}

#[test]
fn test_routes_with_text_extensions() -> Result<()> {
    let router = Router::new()?;

    let route = router.route(&Method::GET, "/status.json")?;
    assert_eq!(route.name(), "status");
    assert_eq!(route.get("extension"), Some("json"));

    let route = router.route(&Method::GET, "/users/christer/images.xml")?;
    assert_eq!(route.name(), "images");
    assert_eq!(route.get("extension"), Some("xml"));

    let route = router.route(&Method::PUT, "/users/christer/images/abc/meta")?;
    assert_eq!(route.name(), "metadata");
    assert_eq!(route.get("extension"), None);

    let route = router.route(&Method::GET, "/keys/pub/access/3.json")?;
    assert_eq!(route.name(), "accessrule");
    assert_eq!(route.get("publickey"), Some("pub"));
    assert_eq!(route.get("accessRuleId"), Some("3"));
    Ok(())
}

#[test]
fn test_trailing_slashes() -> Result<()> {
    let router = Router::new()?;
    assert_eq!(router.route(&Method::GET, "/users/christer/")?.name(), "user");
    assert_eq!(router.route(&Method::GET, "/groups/")?.name(), "groups");
    assert_eq!(router.route(&Method::GET, "/groups/read")?.get("group"), Some("read"));
    Ok(())
}

#[test]
fn test_unknown_paths_and_methods() -> Result<()> {
    let router = Router::new()?;

    assert_eq!(router.route(&Method::GET, "/nope").unwrap_err().status_code(), 404);
    assert_eq!(router.route(&Method::GET, "/users/UPPER").unwrap_err().status_code(), 404);
    assert_eq!(router.route(&Method::PATCH, "/status").unwrap_err().status_code(), 501);
    assert_eq!(router.route(&Method::from_bytes(b"BREW").unwrap(), "/status").unwrap_err().status_code(), 418);
    Ok(())
}
