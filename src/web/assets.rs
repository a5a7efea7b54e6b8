macro_rules! static_file {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/web/static/", $name))
    };
}

pub const INDEX_HTML: &str = static_file!("index.html");
pub const STYLES_CSS: &str = static_file!("styles.css");
pub const APP_JS: &str = static_file!("app.js");
