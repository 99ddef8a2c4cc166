use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// The tab the popup was opened over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub id: Option<i64>,
    pub url: String,
}

/// Capabilities the browser extension runtime lends the popup.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    async fn active_tab(&self) -> Result<ActiveTab>;

    /// Runs a script in the tab and returns `document.documentElement.outerHTML`.
    async fn capture_html(&self, tab: &ActiveTab) -> Result<String>;
}

/// Host over a page that is already in hand.
pub struct StaticPage {
    tab: ActiveTab,
    html: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            tab: ActiveTab {
                id: Some(1),
                url: url.into(),
            },
            html: html.into(),
        }
    }
}

#[async_trait]
impl BrowserHost for StaticPage {
    async fn active_tab(&self) -> Result<ActiveTab> {
        Ok(self.tab.clone())
    }

    async fn capture_html(&self, tab: &ActiveTab) -> Result<String> {
        if tab.id != self.tab.id {
            return Err(anyhow!("no tab with id {:?}", tab.id));
        }
        Ok(self.html.clone())
    }
}
