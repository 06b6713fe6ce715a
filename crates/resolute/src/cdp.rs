//! Chrome DevTools Protocol backend.
//!
//! The engine is synchronous, so the driver owns a private tokio runtime and
//! blocks on every CDP call. Elements are described by an injected script that
//! tags each match with a stable `data-resolute-ref` attribute; later calls
//! find the element again through that attribute.

use crate::driver::{Cookie, Driver, DriverConfig};
use crate::result::{ResoluteError, ResoluteResult};
use crate::snapshot::{ElementHandle, ElementRef};
use crate::strategy::Selector;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio::runtime::Runtime;

/// Attribute holding the driver-assigned element id
pub const REF_ATTRIBUTE: &str = "data-resolute-ref";

// Defines `__describe(el)`; text is textContent with whitespace collapsed.
const DESCRIBE: &str = r"
const __describe = (el) => {
  let ref = el.getAttribute('data-resolute-ref');
  if (!ref) {
    window.__resoluteNext = (window.__resoluteNext || 0) + 1;
    ref = 'r' + window.__resoluteNext;
    el.setAttribute('data-resolute-ref', ref);
  }
  const style = getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  const attributes = {};
  for (const a of el.attributes) attributes[a.name] = a.value;
  const laidOut = style.display !== 'none' && el.getClientRects().length > 0;
  return {
    reference: ref,
    tag: el.tagName.toLowerCase(),
    text: (el.textContent || '').replace(/\s+/g, ' ').trim(),
    attributes,
    value: ('value' in el && el.value != null) ? String(el.value) : null,
    bounding_box: laidOut
      ? { x: rect.x + window.scrollX, y: rect.y + window.scrollY, width: rect.width, height: rect.height }
      : null,
    display_none: !laidOut,
    visibility_hidden: style.visibility === 'hidden',
  };
};
";

/// Browser-backed [`Driver`]
#[derive(Debug)]
pub struct CdpDriver {
    config: DriverConfig,
    runtime: Runtime,
    browser: CdpBrowser,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpDriver {
    /// Launch a browser and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the runtime or the browser cannot start
    pub fn launch(config: DriverConfig) -> ResoluteResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.navigation_timeout);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }
        let cdp_config = builder.build().map_err(|message| ResoluteError::BrowserLaunch { message })?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ResoluteError::BrowserLaunch { message: e.to_string() })?;
            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ResoluteError::BrowserLaunch { message: e.to_string() })?;
            if let Some(ua) = &config.user_agent {
                page.set_user_agent(SetUserAgentOverrideParams::new(ua.clone()))
                    .await
                    .map_err(|e| ResoluteError::BrowserLaunch { message: e.to_string() })?;
            }
            Ok::<_, ResoluteError>((browser, page, handle))
        })?;

        tracing::info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "browser launched"
        );
        Ok(Self {
            config,
            runtime,
            browser,
            page,
            handler,
        })
    }

    /// Launch configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if the browser does not shut down cleanly
    pub fn close(mut self) -> ResoluteResult<()> {
        let result = self.runtime.block_on(self.browser.close());
        self.handler.abort();
        result
            .map(|_| ())
            .map_err(|e| ResoluteError::driver("close", e.to_string()))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn eval<T: DeserializeOwned>(&self, operation: &str, script: String) -> ResoluteResult<T> {
        self.block_on(async {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| ResoluteError::driver(operation, e.to_string()))?;
            result
                .into_value::<T>()
                .map_err(|e| ResoluteError::driver(operation, e.to_string()))
        })
    }

    fn element(&self, operation: &str, element: &ElementRef) -> ResoluteResult<Element> {
        let css = format!("[{REF_ATTRIBUTE}={:?}]", element.as_str());
        self.block_on(self.page.find_element(css)).map_err(|e| {
            tracing::debug!(operation, reference = %element, error = %e, "element lookup failed");
            ResoluteError::StaleElement {
                reference: element.to_string(),
            }
        })
    }

    fn ref_literal(element: &ElementRef) -> ResoluteResult<String> {
        Ok(serde_json::to_string(element.as_str())?)
    }
}

impl Driver for CdpDriver {
    fn navigate(&mut self, url: &str) -> ResoluteResult<()> {
        let timeout = self.config.navigation_timeout;
        let navigation = self.block_on(async { tokio::time::timeout(timeout, self.page.goto(url)).await });
        match navigation {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ResoluteError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ResoluteError::Navigation {
                url: url.to_string(),
                message: format!("no load within {}ms", timeout.as_millis()),
            }),
        }
    }

    fn current_url(&self) -> ResoluteResult<String> {
        self.block_on(self.page.url())
            .map(Option::unwrap_or_default)
            .map_err(|e| ResoluteError::driver("current_url", e.to_string()))
    }

    fn query_all(&self, selector: &Selector) -> ResoluteResult<Vec<ElementHandle>> {
        let css = serde_json::to_string(&selector.to_css())?;
        self.eval(
            "query_all",
            format!("(() => {{ {DESCRIBE} return Array.from(document.querySelectorAll({css})).map(__describe); }})()"),
        )
    }

    fn ancestors(&self, element: &ElementRef) -> ResoluteResult<Vec<ElementHandle>> {
        let reference = Self::ref_literal(element)?;
        let found: Option<Vec<ElementHandle>> = self.eval(
            "ancestors",
            format!(
                "(() => {{ {DESCRIBE}
                  const el = document.querySelector('[{REF_ATTRIBUTE}=' + JSON.stringify({reference}) + ']');
                  if (!el) return null;
                  const out = [];
                  for (let p = el.parentElement; p; p = p.parentElement) out.push(__describe(p));
                  return out;
                }})()"
            ),
        )?;
        found.ok_or_else(|| ResoluteError::StaleElement {
            reference: element.to_string(),
        })
    }

    fn click(&mut self, element: &ElementRef) -> ResoluteResult<()> {
        let target = self.element("click", element)?;
        if let Err(e) = self.block_on(target.click()) {
            // Obscured or zero-size targets still take a dispatched click.
            tracing::debug!(reference = %element, error = %e, "pointer click failed, dispatching");
            self.block_on(target.call_js_fn("function() { this.click(); }", false))
                .map_err(|e| ResoluteError::driver("click", e.to_string()))?;
        }
        Ok(())
    }

    fn type_text(&mut self, element: &ElementRef, text: &str, submit: bool) -> ResoluteResult<()> {
        let target = self.element("type_text", element)?;
        self.block_on(async {
            target
                .call_js_fn(
                    "function() { this.focus(); this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                    false,
                )
                .await?;
            target.type_str(text).await?;
            if submit {
                target.press_key("Enter").await?;
            }
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .map_err(|e| ResoluteError::driver("type_text", e.to_string()))
    }

    fn scroll_into_view(&mut self, element: &ElementRef) -> ResoluteResult<()> {
        let reference = Self::ref_literal(element)?;
        let found: bool = self.eval(
            "scroll_into_view",
            format!(
                "(() => {{
                  const el = document.querySelector('[{REF_ATTRIBUTE}=' + JSON.stringify({reference}) + ']');
                  if (!el) return false;
                  el.scrollIntoView({{ block: 'center', inline: 'center' }});
                  return true;
                }})()"
            ),
        )?;
        if found {
            Ok(())
        } else {
            Err(ResoluteError::StaleElement {
                reference: element.to_string(),
            })
        }
    }

    fn page_text(&self) -> ResoluteResult<String> {
        self.eval("page_text", "document.body ? document.body.innerText : ''".to_string())
    }

    fn set_cookie(&mut self, cookie: &Cookie) -> ResoluteResult<()> {
        let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
        param.path = Some(cookie.path.clone().unwrap_or_else(|| "/".to_string()));
        match &cookie.domain {
            Some(domain) => param.domain = Some(domain.clone()),
            None => param.url = Some(self.current_url()?),
        }
        self.block_on(self.page.set_cookie(param))
            .map(|_| ())
            .map_err(|e| ResoluteError::driver("set_cookie", e.to_string()))
    }

    fn reload(&mut self) -> ResoluteResult<()> {
        self.block_on(self.page.reload())
            .map(|_| ())
            .map_err(|e| ResoluteError::Navigation {
                url: "(reload)".to_string(),
                message: e.to_string(),
            })
    }
}
