//! Search box: turns submitted text into an address or a search-engine query.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::logging::{info, obj, v_str, warn, Domain};

/// Everything `encodeURIComponent` escapes: all but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Text looked like a host name or URL.
    Address(String),
    /// Free text sent to the search engine.
    Search(String),
}

impl Navigation {
    pub fn url(&self) -> &str {
        match self {
            Navigation::Address(url) | Navigation::Search(url) => url,
        }
    }
}

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

fn has_scheme(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// `None` for blank input. Text without spaces that has a dot or an explicit
/// http(s) scheme is an address (`https://` added unless it already starts
/// with "http"); anything else becomes `search_engine_url` + the encoded text.
pub fn classify(input: &str, search_engine_url: &str) -> Option<Navigation> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }
    if !text.contains(' ') && (text.contains('.') || has_scheme(text)) {
        let url = if text.starts_with("http") {
            text.to_string()
        } else {
            format!("https://{}", text)
        };
        Some(Navigation::Address(url))
    } else {
        Some(Navigation::Search(format!(
            "{}{}",
            search_engine_url,
            encode_component(text)
        )))
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str) -> anyhow::Result<()>;
}

/// Hands the URL to the system browser.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        open::that(url)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBox {
    pub query: String,
}

impl SearchBox {
    pub fn set(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    /// Enter pressed: navigate and clear, or do nothing on blank input.
    pub fn submit(&mut self, search_engine_url: &str, navigator: &dyn Navigator) -> Option<Navigation> {
        let nav = classify(&self.query, search_engine_url)?;
        let kind = match nav {
            Navigation::Address(_) => "address",
            Navigation::Search(_) => "search",
        };
        match navigator.navigate(nav.url()) {
            Ok(()) => info(Domain::Search, "navigate", obj(&[("kind", v_str(kind))])),
            Err(err) => warn(
                Domain::Search,
                "navigate_failed",
                obj(&[("kind", v_str(kind)), ("msg", v_str(&err.to_string()))]),
            ),
        }
        self.query.clear();
        Some(nav)
    }
}
