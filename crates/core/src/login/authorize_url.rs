//! Authorization server URLs

/// Build `<auth_base>/<path>?k=v&...`.
///
/// Each value is percent-encoded on its own. Pairs with an empty value are
/// omitted entirely.
///
/// ```
/// use handoff_core::build_auth_url;
///
/// let url = build_auth_url(
///     "https://login.mypurecloud.com",
///     "oauth/authorize",
///     &[("client_id", "abc"), ("redirect_uri", "https://app/cb"), ("org", "")],
/// );
/// assert_eq!(
///     url,
///     "https://login.mypurecloud.com/oauth/authorize?client_id=abc&redirect_uri=https%3A%2F%2Fapp%2Fcb"
/// );
/// ```
pub fn build_auth_url(auth_base: &str, path: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let base = auth_base.trim_end_matches('/');
    if query.is_empty() {
        format!("{base}/{path}")
    } else {
        format!("{base}/{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_encoded_individually() {
        let url = build_auth_url(
            "https://login.example.com",
            "oauth/authorize",
            &[("client_id", "id"), ("response_type", "token"), ("state", "a b&c")],
        );
        assert_eq!(
            url,
            "https://login.example.com/oauth/authorize?client_id=id&response_type=token&state=a%20b%26c"
        );
    }

    #[test]
    fn empty_values_are_omitted_without_dangling_separators() {
        let url = build_auth_url(
            "https://login.example.com/",
            "logout",
            &[("redirect_uri", ""), ("client_id", "id")],
        );
        assert_eq!(url, "https://login.example.com/logout?client_id=id");
    }

    #[test]
    fn no_params_means_no_query() {
        assert_eq!(build_auth_url("https://login.example.com", "logout", &[]), "https://login.example.com/logout");
    }
}
