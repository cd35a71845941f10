mod api_key;
mod url_param;

pub use api_key::ApiKeyHeader;
pub use url_param::UrlParamKey;
