//! Glottocode validation.
//!
//! A languoid identifier is either a regular glottocode -- four lowercase
//! alphanumerics followed by four digits, e.g. `stan1295` -- or a no-code
//! marker of the form `NOCODE` / `NOCODE_<suffix>`. Directory names along a
//! node's ancestry are checked against this pattern; the first component that
//! fails it marks the boundary between the languoid tree and the surrounding
//! repository.

use once_cell::sync::Lazy;
use regex::Regex;

/// The identifier pattern, unanchored. Embedded by callers that match codes
/// inside larger strings.
pub const ID_PATTERN: &str = r"([a-z0-9]{4}[0-9]{4}|NOCODE(_[A-Za-z0-9\-]+)?)";

static ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", ID_PATTERN)).unwrap());

/// Whether `id` is a well-formed languoid identifier.
pub fn is_glottocode(id: &str) -> bool {
    ID_REGEX.is_match(id)
}
