//! Turning a pasted cookie header into an authenticated page.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::page::FeedPage;
use crate::{Error, Result};

/// Default file the cookie is read from when none is given.
pub const DEFAULT_COOKIE_FILE: &str = "cookie.txt";

/// One `name=value` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

// values are credentials; keep them out of logs
impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Cookies parsed from a `name=value; name2=value2` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Parse a raw cookie header.
    ///
    /// Empty input, a segment without `=` or a segment with an empty name
    /// is an authentication failure; nothing has touched the browser yet.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Authentication("cookie is empty".into()));
        }

        let mut cookies = Vec::new();
        for (i, segment) in raw.split(';').enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = segment.split_once('=').ok_or_else(|| {
                Error::Authentication(format!(
                    "malformed cookie segment {}: expected name=value",
                    i + 1
                ))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Authentication(format!(
                    "malformed cookie segment {}: empty name",
                    i + 1
                )));
            }
            cookies.push(Cookie {
                name: name.to_string(),
                value: value.trim().to_string(),
            });
        }

        if cookies.is_empty() {
            return Err(Error::Authentication("cookie is empty".into()));
        }
        Ok(Self { cookies })
    }

    /// Read and parse a cookie file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Authentication(format!("cannot read cookie file {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Cookie by name.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }
}

/// Put every cookie of `jar` into the page's context for `domain`.
pub async fn authenticate<P: FeedPage + ?Sized>(
    page: &mut P,
    jar: &CookieJar,
    domain: &str,
) -> Result<()> {
    for cookie in jar.cookies() {
        page.set_cookie(cookie, domain).await?;
    }
    debug!("set {} cookies for {}", jar.len(), domain);
    Ok(())
}

fn nickname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#","nickName":"(.*?)""#).expect("valid nickname regex"))
}

/// Nickname of the signed-in account, read from the page source.
pub fn detect_nickname(html: &str) -> Option<String> {
    nickname_regex()
        .captures(html)
        .map(|c| c[1].to_string())
        .filter(|n| !n.is_empty())
}
