/// Application name
pub const APP_NAME: &str = "Pictor";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address of the HTTP front-end
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9000";

/// Default root directory of the filesystem storage
pub const DEFAULT_STORAGE_DIR: &str = "data/images";

/// Mime type used when negotiation has nothing better to offer
pub const DEFAULT_MIME_TYPE: &str = "application/json";

/// Routes on which an error model must never be rendered through the requested extension
pub const IMAGE_ROUTES: [&str; 2] = ["image", "globalshorturl"];

/// Query parameters that turn a JSON response into JSONP, in lookup order
pub const JSONP_PARAMS: [&str; 3] = ["callback", "jsonp", "json"];

/// Largest width or height a resize may produce
pub const MAX_TRANSFORMATION_DIMENSION: u32 = 10_000;

/// Default page size of listings
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Application error codes, reported next to the HTTP status
pub mod error_codes {
    pub const ERR_UNSPECIFIED: u16 = 0;

    // Authentication
    pub const AUTH_UNKNOWN_PUBLIC_KEY: u16 = 100;
    pub const AUTH_MISSING_PARAM: u16 = 101;

    // Image resource
    pub const IMAGE_ALREADY_EXISTS: u16 = 200;
    pub const IMAGE_NO_IMAGE_ATTACHED: u16 = 201;
    pub const IMAGE_UNSUPPORTED_MIMETYPE: u16 = 203;
    pub const IMAGE_BROKEN_IMAGE: u16 = 204;
    pub const IMAGE_TRANSFORMATION_ERROR: u16 = 207;
}
