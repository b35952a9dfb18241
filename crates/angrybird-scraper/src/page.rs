//! The browser seen through the handful of operations a scrape needs.

use std::collections::HashMap;

use async_trait::async_trait;
use eoka::{Browser, Page};
use serde::Deserialize;
use tracing::debug;

use crate::config::{BrowserConfig, Field, SelectorMap};
use crate::session::Cookie;
use crate::{Error, Result};

/// Raw text of one tile, keyed by [`Field::key`]. Fields that did not
/// render are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawTile(HashMap<String, String>);

impl RawTile {
    /// Trimmed text for `field`, `None` when missing or blank.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0
            .get(field.key())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn with(mut self, field: Field, text: impl Into<String>) -> Self {
        self.0.insert(field.key().to_string(), text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// Reads every tile in one pass. Called as `(EXTRACT_JS)(selectors)`.
const EXTRACT_JS: &str = r#"
((map) => {
  const out = [];
  for (const tile of document.querySelectorAll(map.item)) {
    const row = {};
    for (const [key, sel] of Object.entries(map.fields)) {
      try {
        if (map.multi.includes(key)) {
          const texts = Array.from(tile.querySelectorAll(sel))
            .map(e => (e.innerText || e.textContent || '').trim())
            .filter(Boolean);
          if (texts.length) row[key] = texts.join(' ');
          continue;
        }
        const el = tile.matches(sel) ? tile : tile.querySelector(sel);
        if (!el) continue;
        if (key === map.link) {
          row[key] = el.href || el.getAttribute('href') || '';
        } else {
          row[key] = (el.innerText || el.textContent || '').trim();
        }
      } catch (e) {
        // a bad selector loses one field, not the tile
      }
    }
    out.push(row);
  }
  return JSON.stringify(out);
})
"#;

/// What the navigator needs from a browser tab.
#[async_trait(?Send)]
pub trait FeedPage {
    /// Navigate to `url`.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Add a cookie for `domain` to the browser context.
    async fn set_cookie(&mut self, cookie: &Cookie, domain: &str) -> Result<()>;

    /// Full page source.
    async fn source(&self) -> Result<String>;

    /// Current location.
    async fn current_url(&self) -> Result<String>;

    /// Whether `selector` matches anything right now.
    async fn has(&self, selector: &str) -> Result<bool>;

    /// Every tile currently in the DOM.
    async fn tiles(&self, selectors: &SelectorMap) -> Result<Vec<RawTile>>;

    /// Ask the page for the next batch.
    async fn scroll(&self) -> Result<()>;

    /// Sleep without giving up the page.
    async fn pause(&self, ms: u64);
}

/// A launched browser with one tab.
pub struct BrowserPage {
    browser: Browser,
    page: Page,
}

impl BrowserPage {
    /// Launch a browser with the given config.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(900),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    /// Underlying page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Save a screenshot; used when a run fails.
    pub async fn screenshot(&self, path: &std::path::Path) -> Result<()> {
        let data = self.page.screenshot().await?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl FeedPage for BrowserPage {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn set_cookie(&mut self, cookie: &Cookie, domain: &str) -> Result<()> {
        self.page
            .set_cookie(&cookie.name, &cookie.value, Some(domain), Some("/"))
            .await?;
        Ok(())
    }

    async fn source(&self) -> Result<String> {
        Ok(self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn has(&self, selector: &str) -> Result<bool> {
        let js = format!(
            "!!document.querySelector({})",
            serde_json::to_string(selector)?
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn tiles(&self, selectors: &SelectorMap) -> Result<Vec<RawTile>> {
        let js = format!(
            "{}({})",
            EXTRACT_JS,
            serde_json::to_string(&selectors.to_script_arg())?
        );
        let json: String = self.page.evaluate(&js).await?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Extraction(format!("tile script returned bad json: {}", e)))
    }

    async fn scroll(&self) -> Result<()> {
        self.page.human().press_key("End").await?;
        Ok(())
    }

    async fn pause(&self, ms: u64) {
        self.page.wait(ms).await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tile_from_script_json() {
        let json = r#"[{"author":"a","likes":" 12K ","music":""},{}]"#;
        let tiles: Vec<RawTile> = serde_json::from_str(json).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].get(Field::Author), Some("a"));
        assert_eq!(tiles[0].get(Field::Likes), Some("12K"));
        assert_eq!(tiles[0].get(Field::Music), None);
        assert!(tiles[1].is_empty());
    }
}
