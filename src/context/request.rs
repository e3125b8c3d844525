use http::header::COOKIE;
use http::HeaderMap;

/// Collect `name=value` pairs from every `Cookie` header, in order of appearance.
///
/// Pairs without a name are skipped; a missing `=` yields an empty value.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|c| c.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Decode a raw query string (`a=1&b=two+words`) into ordered pairs.
///
/// Percent escapes are decoded and `+` becomes a space; repeated keys are kept.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
