pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::safe_truncate_chars;
pub use url_utils::{host_token, is_valid_url, render_listing_url, resolve_href};
