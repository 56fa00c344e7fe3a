use url::Url;

/// Query parameter the hosting page uses to hand the panel its token.
pub const AUTH_TOKEN_PARAM: &str = "authtoken";

/// Reads the `authtoken` query parameter; called at click time, never cached.
pub fn auth_token(page_url: &Url) -> Option<String> {
    page_url
        .query_pairs()
        .find(|(key, _)| key == AUTH_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
}

pub fn auth_token_from_str(page_url: &str) -> Option<String> {
    Url::parse(page_url).ok().as_ref().and_then(auth_token)
}
