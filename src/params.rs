//! Query-string access for the current navigation.

use std::collections::HashMap;

use http::Uri;

/// Flat query parameters; the last value of a repeated key wins.
pub type Parameters = HashMap<String, String>;

/// Flattens the query string of `uri` into [`Parameters`].
///
/// `None` stands for "no navigable URL" (e.g. rendering outside a request) and, like a
/// URL without a query, yields an empty mapping.
pub fn url_parameters(uri: Option<&Uri>) -> Parameters {
    uri.and_then(Uri::query)
        .map(parse_query)
        .unwrap_or_default()
}

/// Decodes an `application/x-www-form-urlencoded` query string.
pub fn parse_query(query: &str) -> Parameters {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
