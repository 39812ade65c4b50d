// spider_chrome re-exports chromiumoxide API
use crate::browser::elements::{ElementDescriptor, MatchResult};
use crate::browser::scripts;
use crate::error::{BrowserError, Result};
use crate::simplify::simplify_html;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};

/// Launch options for the owned Chrome instance.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Explicit Chrome executable; auto-download or system Chrome when None.
    pub chrome_path: Option<String>,
    /// Pass --no-sandbox (Linux AppArmor workaround, required in most CI).
    pub no_sandbox: bool,
    /// Run without a visible window.
    pub headless: bool,
}

impl SessionConfig {
    /// Auto-detect CI environments, which need --no-sandbox and headless.
    pub fn auto() -> Self {
        let is_ci = std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("GITLAB_CI").is_ok()
            || std::env::var("JENKINS_HOME").is_ok()
            || std::env::var("CIRCLECI").is_ok();

        Self {
            chrome_path: None,
            no_sandbox: is_ci,
            headless: is_ci,
        }
    }

    /// Headless with --no-sandbox, the configuration used by the tests.
    pub fn headless() -> Self {
        Self {
            chrome_path: None,
            no_sandbox: true,
            headless: true,
        }
    }
}

struct SessionState {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

/// Owns at most one browser and exactly one active page for the process's
/// lifetime.
///
/// All browsing primitives operate on that single page. The session starts
/// uninitialized; `initialize` must be called exactly once before any
/// primitive, and any primitive invoked outside the ready state fails with
/// [`BrowserError::NotInitialized`]. `teardown` must run on every exit path
/// so no Chrome process is leaked; it is safe to call repeatedly.
///
/// The session performs no internal retries and imposes no timeouts beyond
/// the engine's own; sequencing and retry policy belong to the caller.
pub struct BrowserSession {
    state: Option<SessionState>,
    temp_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Create an uninitialized session. Performs no I/O.
    pub fn new() -> Self {
        Self {
            state: None,
            temp_dir: None,
        }
    }

    /// Launch Chrome and open the single active page.
    pub async fn initialize(&mut self, config: SessionConfig) -> Result<()> {
        if self.state.is_some() {
            return Err(BrowserError::LaunchFailed(
                "session is already initialized".to_string(),
            ));
        }

        log::info!("Starting browser...");

        // Unique profile dir so parallel sessions never share state.
        let unique_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .as_nanos();
        let temp_dir = std::env::temp_dir().join(format!("webnavigator-{}", unique_id));
        std::fs::create_dir_all(&temp_dir).map_err(|e| {
            BrowserError::LaunchFailed(format!("Failed to create temp directory: {}", e))
        })?;

        let mut builder = if config.headless {
            BrowserConfig::builder()
        } else {
            BrowserConfig::builder().with_head()
        };

        builder = builder.user_data_dir(&temp_dir);

        if config.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }

        if let Some(path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else {
            // Try to auto-download Chrome; fall back to whatever the builder
            // can find on the system.
            match Self::ensure_chrome_installed().await {
                Ok(path) => {
                    builder = builder.chrome_executable(path);
                }
                Err(e) => {
                    log::warn!("Chrome auto-download unavailable ({}), trying system Chrome", e);
                }
            }
        }

        let browser_config = builder
            .build()
            .map_err(|e| BrowserError::LaunchFailed(launch_help(&e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(launch_help(&e.to_string())))?;

        // Drive CDP events for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while (handler.next().await).is_some() {
                // Handle browser events
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("Failed to open page: {}", e)))?;

        self.temp_dir = Some(temp_dir);
        self.state = Some(SessionState {
            browser,
            page,
            handler_task,
        });

        log::info!("Browser started.");
        Ok(())
    }

    /// Close the page and browser and release the launch resources.
    ///
    /// Safe to call more than once and from a terminal handler. A failure to
    /// close cleanly is logged, not returned, so the rest of the release
    /// still runs.
    pub async fn teardown(&mut self) {
        if let Some(mut state) = self.state.take() {
            log::info!("Closing browser...");
            if let Err(e) = state.browser.close().await {
                log::warn!("Failed to close browser cleanly: {}", e);
            }
            state.handler_task.abort();
            log::info!("Browser closed.");
        }
        if let Some(temp_dir) = self.temp_dir.take() {
            let _ = std::fs::remove_dir_all(&temp_dir);
        }
    }

    /// Whether `initialize` has completed and `teardown` has not run.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Check that the browser connection still answers.
    pub async fn is_alive(&self) -> bool {
        match &self.state {
            Some(state) => matches!(
                tokio::time::timeout(tokio::time::Duration::from_secs(2), state.page.url()).await,
                Ok(Ok(_))
            ),
            None => false,
        }
    }

    /// The single active page; fails fast when the session is not ready.
    fn page(&self) -> Result<&Page> {
        self.state
            .as_ref()
            .map(|state| &state.page)
            .ok_or(BrowserError::NotInitialized)
    }

    // ===== DIRECT-ACTION PRIMITIVES =====

    /// Navigate the active page to `url`, block until the engine's load
    /// signal, and return the resulting page title.
    ///
    /// No URL validation beyond what navigation itself rejects.
    pub async fn visit(&self, url: &str) -> Result<String> {
        let page = self.page()?;

        log::info!("Visiting URL: {}", url);

        page.goto(url)
            .await
            .map_err(|e| navigation_error(url, e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| navigation_error(url, e))?;

        let title = page.get_title().await?.unwrap_or_default();
        log::info!("Visited {}, title: {}", url, title);
        Ok(title)
    }

    /// Set the value of the first element matching `selector` to `text`.
    ///
    /// Any existing content is selected first, so typing replaces it rather
    /// than appending at the caret. Typing goes through real key events, so
    /// input-event listeners on the page observe the change.
    pub async fn fill_text(&self, selector: &str, text: &str) -> Result<()> {
        if selector.is_empty() || text.is_empty() {
            return Err(BrowserError::InvalidArgument(
                "selector and text must be provided".to_string(),
            ));
        }
        let page = self.page()?;

        log::info!("Filling text in selector '{}'", selector);

        let element = page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;

        let tag = element
            .call_js_fn("function() { return this.tagName.toLowerCase(); }", false)
            .await
            .map_err(BrowserError::from)?
            .result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        if !matches!(tag.as_str(), "input" | "textarea") {
            return Err(BrowserError::ElementNotFound(format!(
                "{} is not a fillable element",
                selector
            )));
        }

        element
            .click()
            .await
            .map_err(|e| BrowserError::InteractionFailed(format!("{}: {}", selector, e)))?;
        // Select whatever the field already holds so the keystrokes replace
        // it instead of inserting at the caret.
        element
            .call_js_fn("function() { this.select(); }", false)
            .await
            .map_err(|e| BrowserError::InteractionFailed(format!("{}: {}", selector, e)))?;
        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::InteractionFailed(format!("{}: {}", selector, e)))?;

        log::info!("Filled text in selector '{}'", selector);
        Ok(())
    }

    /// Click the first element matching the CSS selector.
    pub async fn click_element(&self, selector: &str) -> Result<()> {
        if selector.is_empty() {
            return Err(BrowserError::InvalidArgument(
                "selector must be provided".to_string(),
            ));
        }
        let page = self.page()?;

        let element = page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::InteractionFailed(format!("{}: {}", selector, e)))?;

        log::info!("Clicked element with selector '{}'", selector);
        Ok(())
    }

    // ===== PAGE CONTENT =====

    /// Raw markup of the current page.
    pub async fn page_source(&self) -> Result<String> {
        let page = self.page()?;
        Ok(page.content().await?)
    }

    /// Markup of the current page reduced to the model-readable form.
    pub async fn page_content(&self) -> Result<String> {
        let raw = self.page_source().await?;
        let cleaned = simplify_html(&raw);
        log::info!(
            "Retrieved and cleaned page content, length: {} characters",
            cleaned.len()
        );
        Ok(cleaned)
    }

    /// Current URL of the active page.
    pub async fn current_url(&self) -> Result<String> {
        let page = self.page()?;
        page.url()
            .await?
            .ok_or_else(|| BrowserError::Other("page has no URL".to_string()))
    }

    /// Title of the active page.
    pub async fn title(&self) -> Result<String> {
        let page = self.page()?;
        Ok(page.get_title().await?.unwrap_or_default())
    }

    // ===== SCANNER AND LOCATOR =====

    /// Enumerate visible interactive elements in DOM encounter order.
    ///
    /// Returns an empty list (not an error) when nothing qualifies.
    pub async fn scan_interactive_elements(&self) -> Result<Vec<ElementDescriptor>> {
        let script = scripts::scan_interactive_elements();
        let elements: Vec<ElementDescriptor> = self.execute_script_typed(&script).await?;
        log::info!("Found {} interactive elements on the page", elements.len());
        Ok(elements)
    }

    /// Find the first visible element whose text matches `text` and click it.
    ///
    /// With `exact_match` the comparable text must equal `text` exactly;
    /// otherwise a case-insensitive substring match applies. First match in
    /// document order wins. Returns a confirmation message and the element
    /// info captured immediately before the click fired.
    pub async fn click_by_text(
        &self,
        text: &str,
        exact_match: bool,
    ) -> Result<(String, MatchResult)> {
        if text.is_empty() {
            return Err(BrowserError::InvalidArgument(
                "text must be provided".to_string(),
            ));
        }

        log::info!(
            "Searching for element with text '{}' (exact_match={})",
            text,
            exact_match
        );

        let script = scripts::click_by_text(text, exact_match);
        let result: MatchResult = self.execute_script_typed(&script).await?;

        if !result.found {
            return Err(BrowserError::TextNotFound(text.to_string()));
        }

        let message = format!("Clicked {} with text \"{}\"", result.tag, result.text);
        log::info!("{}", message);
        Ok((message, result))
    }

    // ===== SCRIPT EVALUATION =====

    /// Execute arbitrary JavaScript in the page context.
    ///
    /// Evaluation failures (including in-page exceptions) propagate as
    /// [`BrowserError::CdpError`].
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.page()?;

        let result = page.evaluate(script).await?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript and deserialize its completion value.
    pub async fn execute_script_typed<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T> {
        let page = self.page()?;

        let result = page.evaluate(script).await?;

        result
            .into_value()
            .map_err(|e| BrowserError::Other(format!("Failed to deserialize result: {}", e)))
    }

    // ===== CHROME PROVISIONING =====

    /// Ensure Chrome is installed, downloading if necessary.
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| BrowserError::Other("Cannot determine cache directory".to_string()))?
            .join("webnavigator")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create cache dir: {}", e)))?;

        let revision_info_path = cache_dir.join(".downloaded");
        if revision_info_path.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir).await {
                return Ok(executable);
            }
        }

        log::info!("Downloading Chrome for Testing (first time only, ~150MB)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| BrowserError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&revision_info_path, "downloaded")
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to write marker: {}", e)))?;

        log::info!("Chrome downloaded successfully");

        Ok(info.executable_path)
    }

    /// Find the Chrome executable in the cache directory.
    async fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        let possible_paths = vec![
            cache_dir.join("chrome"),
            cache_dir.join("chrome.exe"),
            cache_dir.join("Google Chrome.app/Contents/MacOS/Google Chrome"),
            cache_dir.join("chrome-linux/chrome"),
            cache_dir.join("chrome-mac/Chromium.app/Contents/MacOS/Chromium"),
            cache_dir.join("chrome-win/chrome.exe"),
        ];

        possible_paths.into_iter().find(|path| path.exists())
    }
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Teardown removes this on the normal path; Drop covers the rest.
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

fn navigation_error(url: &str, e: chromiumoxide::error::CdpError) -> BrowserError {
    let message = e.to_string();

    // "oneshot canceled" means the browser connection is dead.
    if message.contains("oneshot canceled") {
        BrowserError::NavigationFailed(
            "Browser connection lost. The browser may have been closed or crashed. \
             Please launch the browser again."
                .to_string(),
        )
    } else {
        BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, message))
    }
}

fn launch_help(e: &str) -> String {
    format!(
        "{}. \n\n\
         Chrome not found. You can:\n\
         - Install Chrome: https://www.google.com/chrome/\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - macOS: brew install --cask google-chrome\n\
         - Or specify path: --chrome-path /path/to/chrome\n\
         - Linux sandbox issue? Try: --no-sandbox",
        e
    )
}
