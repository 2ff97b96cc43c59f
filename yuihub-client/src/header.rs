//! Authentication header construction.
//!
//! A request carries `Content-Type: application/json` and at most one
//! authentication header, chosen per attempt by [`HeaderChoice`].

use std::fmt;

use yuihub_core::{AuthScheme, Secret};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const TOKEN_HEADER: &str = "x-yuihub-token";

const JSON: &str = "application/json";

/// The concrete header that carries the credential on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderChoice {
    Authorization,
    Token,
}

impl HeaderChoice {
    /// The other concrete choice.
    pub fn alternate(self) -> Self {
        match self {
            Self::Authorization => Self::Token,
            Self::Token => Self::Authorization,
        }
    }

    pub fn header_name(self) -> &'static str {
        match self {
            Self::Authorization => AUTHORIZATION,
            Self::Token => TOKEN_HEADER,
        }
    }
}

impl fmt::Display for HeaderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "x-yuihub-token"),
        }
    }
}

/// Ordered header list for one attempt.
///
/// `Debug` masks authentication values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(&'static str, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn insert(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a header by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|(n, v)| (n, if is_sensitive(n) { "***" } else { v })),
            )
            .finish()
    }
}

/// Whether a header name carries a credential.
pub fn is_sensitive(name: &str) -> bool {
    name.eq_ignore_ascii_case(AUTHORIZATION) || name.eq_ignore_ascii_case(TOKEN_HEADER)
}

/// Build the headers for one attempt.
///
/// Without a credential only the content type is set, which is a valid
/// unauthenticated request.
pub fn build_headers(
    credential: Option<&Secret>,
    choice: HeaderChoice,
    scheme: AuthScheme,
) -> HeaderSet {
    let mut headers = HeaderSet::new();
    headers.insert(CONTENT_TYPE, JSON);

    let Some(credential) = credential else {
        return headers;
    };
    let key = credential.expose();

    match choice {
        HeaderChoice::Token => headers.insert(TOKEN_HEADER, key),
        HeaderChoice::Authorization => {
            let value = match scheme {
                AuthScheme::Bearer if has_bearer_prefix(key) => key.to_string(),
                AuthScheme::Bearer => format!("Bearer {}", key),
                AuthScheme::None => key.to_string(),
            };
            headers.insert(AUTHORIZATION, value);
        }
    }

    headers
}

/// `Bearer` (any case) followed by whitespace.
fn has_bearer_prefix(value: &str) -> bool {
    let Some((word, rest)) = value.split_at_checked(6) else {
        return false;
    };
    word.eq_ignore_ascii_case("bearer") && rest.starts_with(char::is_whitespace)
}
