//! Built-in journeys against a retail site.
//!
//! Every selector, pattern and URL lives in [`SiteProfile`]; the functions here
//! only arrange them into strategy lists. The defaults describe the US
//! storefront the suite was written against.

use crate::config::Credentials;
use crate::driver::Cookie;
use crate::effect::Effect;
use crate::intent::{FieldValue, Intent};
use crate::overlay::{OverlayGroup, OverlaySweep};
use crate::pattern::TextPattern;
use crate::result::ResoluteResult;
use crate::scenario::{ActStep, Scenario, Step, DEFAULT_MAX_CLICKS};
use crate::stepper::{Convergence, DEFAULT_MAX_ITERATIONS};
use crate::strategy::{ActOptions, Selector, Strategy, StrategyList};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selectors, patterns and URLs of one storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Home page with the language forced
    pub home_url: String,
    /// Help hub
    pub help_url: String,
    /// Order history, the fallback after a sign-in redirect
    pub order_history_url: String,
    /// Sign-in page
    pub signin_url: String,
    /// Cart page
    pub cart_url: String,
    /// Product page template; `{asin}` is substituted
    pub product_url: String,
    /// Cookies that pin language and currency
    pub locale_cookies: Vec<Cookie>,
    /// Present when the page already renders in English
    pub english_ui: String,
    /// Header readiness probes
    pub header: Vec<String>,
    /// Customer-service link text
    pub customer_service: String,
    /// Hamburger menu entries
    pub menu_items: String,
    /// Footer links
    pub footer_links: String,
    /// Visible clickable containers on help pages
    pub clickable: String,
    /// "Where's My Stuff" text
    pub wims: String,
    /// "Track your package" text
    pub track: String,
    /// Order-related fallbacks
    pub orders: String,
    /// Text expected on the tracking destination
    pub destination: String,
    /// Search box candidates
    pub search_box: Vec<String>,
    /// Search results container
    pub search_results: String,
    /// Cart badge counter
    pub cart_count: String,
    /// Add-to-cart controls
    pub add_to_cart: Vec<String>,
    /// "Add to Cart" button text
    pub add_to_cart_text: String,
    /// "See all buying choices" links, used when no add-to-cart control exists
    pub buying_choices: Vec<String>,
    /// Add-to-cart inside the offer listing
    pub offer_add_to_cart: String,
    /// Fields that carry the selected ASIN into the cart form
    pub asin_inputs: String,
    /// Add-to-cart button carrying the ASIN as `data-asin`
    pub asin_button: String,
    /// Coverage upsell refusals
    pub no_coverage: Vec<String>,
    /// Links that open the cart
    pub cart_links: Vec<String>,
    /// Variant swatch container
    pub swatches: String,
    /// Header sign-in link
    pub signin_link: String,
    /// Greeting shown to signed-out visitors
    pub signed_out: String,
    /// Cart page containers
    pub cart_structure: String,
    /// Cart page heading text
    pub cart_heading: String,
    /// Item rows of the active cart
    pub cart_items: String,
    /// Email field candidates
    pub email_field: Vec<String>,
    /// Continue button candidates
    pub continue_button: Vec<String>,
    /// Password field candidates
    pub password_field: Vec<String>,
    /// Sign-in submit
    pub signin_submit: String,
    /// Cart delete controls, most specific first
    pub delete_controls: Vec<String>,
    /// Text of an empty cart
    pub empty_cart: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        let s = |v: &str| v.to_string();
        let list = |v: &[&str]| -> Vec<String> { v.iter().map(|x| (*x).to_string()).collect() };
        Self {
            home_url: s("https://www.amazon.com/?language=en_US"),
            help_url: s("https://www.amazon.com/gp/help/customer/display.html"),
            order_history_url: s("https://www.amazon.com/gp/css/order-history"),
            signin_url: s("https://www.amazon.com/ap/signin?language=en_US"),
            cart_url: s("https://www.amazon.com/gp/cart/view.html?ref_=nav_cart"),
            product_url: s("https://www.amazon.com/dp/{asin}?_encoding=UTF8&psc=1"),
            locale_cookies: vec![
                Cookie::new("lc-main", "en_US").with_domain(".amazon.com"),
                Cookie::new("i18n-prefs", "USD").with_domain(".amazon.com"),
            ],
            english_ui: s(r#"html[lang^="en"]"#),
            header: list(&["#nav-xshop a", "#navbar, #nav-belt, #nav-main a"]),
            customer_service: s("Customer Service|Help"),
            menu_items: s("#hmenu-content a.hmenu-item"),
            footer_links: s("footer a"),
            clickable: s(r#".fs-match-card, .fs-hub-card, div[role="button"], button, a, label, span"#),
            wims: s("Where('?s| is) My Stuff"),
            track: s("Track your package"),
            orders: s("Your Orders|Order History|Orders|Returns & Orders|Help with an order"),
            destination: s("Your Orders|Order History|Track Package"),
            search_box: list(&[
                "#twotabsearchtextbox",
                r#"input[name="field-keywords"]"#,
                r#"form[role="search"] input[type="text"]"#,
            ]),
            search_results: s("div.s-main-slot"),
            cart_count: s("#nav-cart-count"),
            add_to_cart: list(&[
                "#add-to-cart-button",
                r#"input[name="submit.addToCart"]"#,
                r#"input[aria-labelledby="submit.add-to-cart-announce"]"#,
                r#"input[title="Add to Cart"]"#,
            ]),
            add_to_cart_text: s("^Add to Cart$"),
            buying_choices: list(&[
                "a#buybox-see-all-buying-choices-announce",
                r#"a[href*="buyingoptions"]"#,
                "#buybox-see-all-buying-choices",
            ]),
            offer_add_to_cart: s(r#"input[aria-labelledby*="aod-offer-addToCart"]"#),
            asin_inputs: s(concat!(
                r#"form#addToCart input[name="ASIN"], form[action*="/addToCart"] input[name="ASIN"], "#,
                r#"form[action*="/cart"] input[name="ASIN"], input#ASIN"#
            )),
            asin_button: s("#add-to-cart-button"),
            no_coverage: list(&["#attachSiNoCoverage", "input#siNoCoverage-announce", r#"button[aria-label*="No Thanks"]"#]),
            cart_links: list(&[
                "#attach-view-cart-button-form a, a#attach-sidesheet-view-cart-button",
                r#"a[href*="/gp/cart/view.html"]"#,
                r#"a#nav-cart, a[aria-label*="Cart"], a[href*="/cart"]"#,
            ]),
            swatches: s("#tp-inline-twister-dim-values-container"),
            signin_link: s(r#"#nav-link-accountList > a[data-nav-role="signin"]"#),
            signed_out: s("Hello, sign in"),
            cart_structure: s(r#"#sc-active-cart, [data-cel-widget="sc-item-list"]"#),
            cart_heading: s("Your Amazon Cart"),
            cart_items: s("#sc-active-cart .sc-list-item"),
            email_field: list(&["#ap_email", r#"input[name="email"]"#]),
            continue_button: list(&[
                r#"input.a-button-input[type="submit"][aria-labelledby="continue-announce"]"#,
                "#continue",
                r#"input[name="continue"]"#,
            ]),
            password_field: list(&["#ap_password", r#"input[name="password"]"#]),
            signin_submit: s("#signInSubmit"),
            delete_controls: list(&[
                r#"input[data-action="delete-active"]"#,
                r#"input[name^="submit.delete-active"]"#,
                r#"input[name^="submit.delete"]"#,
                r#"input[value="Delete"]"#,
                r#"[data-action="delete"] input[type="submit"]"#,
            ]),
            empty_cart: s("Your Amazon Cart is empty"),
        }
    }
}

impl SiteProfile {
    /// Product page for `asin`
    #[must_use]
    pub fn product_page(&self, asin: &str) -> String {
        self.product_url.replace("{asin}", asin)
    }

    fn pattern(source: &str) -> ResoluteResult<TextPattern> {
        TextPattern::new(source)
    }

    // Whole-text match, so containers that merely include the text do not qualify.
    fn whole(source: &str) -> ResoluteResult<TextPattern> {
        TextPattern::new(format!("^({source})$"))
    }

    fn css_list(selectors: &[String]) -> ResoluteResult<StrategyList> {
        StrategyList::new(selectors.iter().map(Strategy::css).collect())
    }

    /// Overlay sweep that refuses a coverage upsell before anything else
    #[must_use]
    pub fn upsell_sweep(&self) -> OverlaySweep {
        OverlaySweep::default().with_priority_group(OverlayGroup::new(
            "coverage upsell",
            self.no_coverage.iter().map(Strategy::css).collect(),
        ))
    }

    /// The cart page rendered, by structure or by heading
    fn cart_rendered(&self) -> Effect {
        Effect::Any(vec![
            Effect::Present {
                selector: Selector::css(self.cart_structure.clone()),
                text: None,
            },
            Effect::Present {
                selector: Selector::css("body"),
                text: Some(TextPattern::contains(&self.cart_heading)),
            },
        ])
    }

    /// Strategies that open a visible element whose text matches `text`, then
    /// any hidden match through its nearest visible ancestor
    fn visible_then_hidden(&self, text: &str) -> ResoluteResult<StrategyList> {
        Ok(StrategyList::of(Strategy::css(self.clickable.clone()).with_text(Self::pattern(text)?))
            .then(Strategy::css("*").with_text(Self::whole(text)?).allow_hidden()))
    }
}

/// What the cart journey buys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPlan {
    /// Search query
    pub query: String,
    /// Product identifier
    pub asin: String,
    /// Fuzzy product title
    pub title: String,
    /// Product page with colour variants
    pub variant_url: String,
    /// Alt text of the wanted swatch
    pub variant: String,
    /// Quantity to reach in the cart
    pub target_quantity: i64,
}

impl Default for CartPlan {
    fn default() -> Self {
        Self {
            query: "Bostitch Personal Electric Pencil Sharpener, Powerful Stall-Free Motor, High Capacity Shavings Tray, Blue (EPS4-BLUE)".to_string(),
            asin: "B00125KXGI".to_string(),
            title: "Electric Pencil Sharpener".to_string(),
            variant_url: "https://www.amazon.com/Scissors-iBayam-Crafting-Scrapbooking-Knitting/dp/B07H3QKN2Z".to_string(),
            variant: "Yellow, Grey, Blue".to_string(),
            target_quantity: 4,
        }
    }
}

fn patient(options: &ActOptions, ms: u64) -> ActOptions {
    options.clone().with_timeout_ms(ms).with_force(true)
}

fn locale_steps(site: &SiteProfile, mut scenario: Scenario) -> Scenario {
    for cookie in &site.locale_cookies {
        scenario = scenario.step(format!("cookie {}", cookie.name), Step::SetCookie(cookie.clone()));
    }
    scenario
        .act(
            "open home page",
            ActStep::new(Intent::navigate(site.home_url.clone()), StrategyList::of(Strategy::navigate(site.home_url.clone()))),
        )
        .step(
            "force english",
            Step::Unless {
                condition: Effect::Present {
                    selector: Selector::css(site.english_ui.clone()),
                    text: None,
                },
                step: Box::new(Step::Reload),
            },
        )
}

/// Customer service to "Track your package"
///
/// # Errors
///
/// Returns error if a pattern in `site` does not compile
pub fn track_package(site: &SiteProfile, options: &ActOptions) -> ResoluteResult<Scenario> {
    let cs = SiteProfile::pattern(&site.customer_service)?;
    let header = SiteProfile::css_list(&site.header)?;

    let customer_service = StrategyList::of(Strategy::css("a").with_text(cs.clone()))
        .then(Strategy::css(site.menu_items.clone()).with_text(cs.clone()))
        .then(Strategy::css(site.footer_links.clone()).with_text(cs).allow_hidden())
        .then(Strategy::navigate(site.help_url.clone()).labelled("direct help url"));

    let track = site
        .visible_then_hidden(&site.track)?
        .then(Strategy::css(site.clickable.clone()).with_text(SiteProfile::pattern(&site.orders)?))
        .then(Strategy::css("*").with_text(SiteProfile::whole(&site.orders)?).allow_hidden());

    let scenario = locale_steps(site, Scenario::new("track-package"))
        .step("dismiss overlays", Step::DismissOverlays(OverlaySweep::default()))
        .act(
            "header ready",
            ActStep::new(Intent::find_text(TextPattern::any()), header)
                .with_options(options.clone().with_timeout_ms(15_000).with_visible(false)),
        )
        .step("dismiss overlays again", Step::DismissOverlays(OverlaySweep::default()))
        .act(
            "open customer service",
            ActStep::new(Intent::click("Customer Service"), customer_service)
                .with_options(patient(options, 15_000).expecting(Effect::UrlContains("/help".to_string())))
                .with_retry(StrategyList::of(Strategy::navigate(site.help_url.clone()))),
        )
        .step("dismiss overlays on help page", Step::DismissOverlays(OverlaySweep::default()))
        .act(
            "open where's my stuff",
            ActStep::new(Intent::click("Where's My Stuff"), site.visible_then_hidden(&site.wims)?)
                .with_options(patient(options, 8_000))
                .optional(),
        )
        .act(
            "open track your package",
            ActStep::new(Intent::click("Track your package"), track).with_options(patient(options, 12_000)),
        )
        .step(
            "leave sign-in",
            Step::Redirect {
                when_url_contains: "signin".to_string(),
                to: site.order_history_url.clone(),
            },
        )
        .act(
            "destination reached",
            ActStep::new(
                Intent::assert_text(SiteProfile::pattern(&site.destination)?),
                StrategyList::of(Strategy::css("h1, h2, h3, a, span, div")),
            )
            .with_options(options.clone().with_timeout_ms(15_000)),
        );
    Ok(scenario)
}

fn open_cart(site: &SiteProfile, options: &ActOptions) -> ResoluteResult<ActStep> {
    let links = SiteProfile::css_list(&site.cart_links)?
        .then(Strategy::navigate(site.cart_url.clone()).labelled("direct cart url"));
    let reached = Effect::All(vec![Effect::UrlContains("/cart".to_string()), site.cart_rendered()]);
    Ok(ActStep::new(Intent::click("cart"), links)
        .with_options(patient(options, 12_000).expecting(reached))
        .with_retry(StrategyList::of(Strategy::navigate(site.cart_url.clone()))))
}

/// Opens the offer listing when the page has no add-to-cart control, then adds
/// through whichever control is there
fn add_to_cart(site: &SiteProfile, options: &ActOptions, what: &str, scenario: Scenario) -> ResoluteResult<Scenario> {
    let has_control = Effect::Any(
        site.add_to_cart
            .iter()
            .map(|css| Effect::Present {
                selector: Selector::css(css.clone()),
                text: None,
            })
            .collect(),
    );
    let offers = SiteProfile::css_list(&site.buying_choices)?;
    let buying_choices = ActStep::new(Intent::click("see all buying choices"), offers)
        .with_options(patient(options, 5_000))
        .optional();
    let controls = SiteProfile::css_list(&site.add_to_cart)?
        .then(Strategy::css(site.offer_add_to_cart.clone()))
        .then(Strategy::css("input, button").with_text(SiteProfile::pattern(&site.add_to_cart_text)?));

    Ok(scenario
        .step(
            format!("open buying choices for {what}"),
            Step::Unless {
                condition: has_control,
                step: Box::new(Step::Act(buying_choices)),
            },
        )
        .act(
            format!("add {what} to cart"),
            ActStep::new(Intent::click(format!("add {what} to cart")), controls)
                .with_options(patient(options, 15_000).expecting(Effect::counter_increment(site.cart_count.clone()))),
        ))
}

/// Search, add two products, raise a quantity, sign in and empty the cart
///
/// # Errors
///
/// Returns error if a pattern in `site` or `plan` does not compile
pub fn cart_workflow(site: &SiteProfile, plan: &CartPlan, options: &ActOptions) -> ResoluteResult<Scenario> {
    let asin = &plan.asin;
    let product_page = site.product_page(asin);
    let row = format!(r#"[data-asin="{asin}"]"#);

    let open_product = StrategyList::of(Strategy::css(format!(
        r#"div.s-result-item[data-asin="{asin}"] h2 a.a-link-normal"#
    )))
    .then(Strategy::css(format!(r#"{} a[href*="/{asin}"]"#, site.search_results)))
    .then(
        Strategy::css(format!("{} h2 a.a-link-normal", site.search_results))
            .with_text(SiteProfile::pattern(&regex::escape(&plan.title))?),
    )
    .then(Strategy::navigate(product_page.clone()).labelled("direct product url"));

    let swatch_item = format!(r#"{} li[title*="{}"]"#, site.swatches, plan.variant);
    let swatch = StrategyList::of(Strategy::css(format!(r#"{} li img[alt="{}"]"#, site.swatches, plan.variant)))
        .then(
            Strategy::css(format!(r#"{swatch_item} input.a-button-input[role="radio"]"#)).allow_hidden(),
        );
    let swatch_selected = Effect::All(vec![
        Effect::Present {
            selector: Selector::css(format!(
                r#"{} span.a-button.a-button-selected img[alt="{}"]"#,
                site.swatches, plan.variant
            )),
            text: None,
        },
        Effect::Propagated {
            source: Selector::css(swatch_item),
            attribute: "data-asin".to_string(),
            sinks: vec![
                (Selector::css(site.asin_inputs.clone()), "value".to_string()),
                (Selector::css(site.asin_button.clone()), "data-asin".to_string()),
                (Selector::css(site.asin_button.clone()), "data-hover-asin".to_string()),
            ],
        },
    ]);

    let quantity = Convergence::new(
        "quantity",
        StrategyList::of(Strategy::css(format!(r#"{row} [data-a-selector="value"]"#))),
        StrategyList::of(Strategy::css(format!(r#"{row} [data-a-selector="increment"]"#)))
            .then(Strategy::css(format!(r#"{row} button[data-action="a-stepper-increment"]"#))),
        plan.target_quantity,
    )
    .with_max_iterations(DEFAULT_MAX_ITERATIONS)
    .with_settle(Selector::css(format!(r#"{row} [data-a-selector="spinner"] .a-spinner"#)))
    .with_options(options.clone().with_timeout_ms(12_000));

    let search = Intent::set_field("search box", FieldValue::literal(plan.query.clone())).submitting();
    let email = Intent::set_field("email", FieldValue::secret(Credentials::EMAIL));
    let password = Intent::set_field("password", FieldValue::secret(Credentials::PASSWORD));

    let signed_in = Effect::All(vec![
        site.cart_rendered(),
        Effect::TextAbsent(TextPattern::contains(&site.signed_out)),
    ]);
    let emptied = Effect::Any(vec![
        Effect::Present {
            selector: Selector::css("body"),
            text: Some(TextPattern::contains(&site.empty_cart)),
        },
        Effect::Gone {
            selector: Selector::css(site.cart_items.clone()),
        },
    ]);

    let scenario = locale_steps(site, Scenario::new("cart-workflow"))
        .step("dismiss overlays", Step::DismissOverlays(OverlaySweep::default()))
        .act(
            "search for product",
            ActStep::new(search, SiteProfile::css_list(&site.search_box)?).with_options(patient(options, 15_000)),
        )
        .act(
            "results ready",
            ActStep::new(
                Intent::find_text(TextPattern::any()),
                StrategyList::of(Strategy::css(site.search_results.clone())),
            )
            .with_options(options.clone().with_timeout_ms(15_000).with_visible(false))
            .with_retry(StrategyList::of(Strategy::navigate(product_page.clone()))),
        )
        .act(
            "open product page",
            ActStep::new(Intent::click(format!("product {asin}")), open_product)
                .with_options(patient(options, 15_000).expecting(Effect::UrlContains(format!("/{asin}"))))
                .with_retry(StrategyList::of(Strategy::navigate(product_page))),
        )
        .step("dismiss overlays on product page", Step::DismissOverlays(OverlaySweep::default()));
    let scenario = add_to_cart(site, options, "product", scenario)?
        .step("refuse coverage", Step::DismissOverlays(site.upsell_sweep()))
        .act(
            "open variant page",
            ActStep::new(
                Intent::navigate(plan.variant_url.clone()),
                StrategyList::of(Strategy::navigate(plan.variant_url.clone())),
            ),
        )
        .step("dismiss overlays on variant page", Step::DismissOverlays(OverlaySweep::default()))
        .act(
            "select colour",
            ActStep::new(Intent::click(format!("colour {}", plan.variant)), swatch)
                .with_options(patient(options, 15_000).expecting(swatch_selected)),
        );
    let scenario = add_to_cart(site, options, "variant", scenario)?
        .step("refuse coverage again", Step::DismissOverlays(site.upsell_sweep()))
        .act("open cart", open_cart(site, options)?)
        .step("dismiss overlays on cart", Step::DismissOverlays(OverlaySweep::default()))
        .step("raise quantity", Step::Converge(quantity))
        .act(
            "open sign-in",
            ActStep::new(
                Intent::click("sign in"),
                StrategyList::of(Strategy::css(site.signin_link.clone()))
                    .then(Strategy::navigate(site.signin_url.clone()).labelled("direct sign-in url")),
            )
            .with_options(patient(options, 20_000)),
        )
        .act(
            "enter email",
            ActStep::new(email, SiteProfile::css_list(&site.email_field)?).with_options(patient(options, 20_000)),
        )
        .act(
            "continue",
            ActStep::new(Intent::click("continue"), SiteProfile::css_list(&site.continue_button)?)
                .with_options(patient(options, 15_000))
                .optional(),
        )
        .act(
            "enter password",
            ActStep::new(password, SiteProfile::css_list(&site.password_field)?).with_options(patient(options, 20_000)),
        )
        .act(
            "submit sign-in",
            ActStep::new(Intent::click("sign in submit"), StrategyList::of(Strategy::css(site.signin_submit.clone())))
                .with_options(patient(options, 30_000).expecting(Effect::UrlContains("/cart".to_string()))),
        )
        .step(
            "signed in on cart",
            Step::Verify {
                effect: signed_in,
                options: options.clone().with_timeout_ms(20_000),
            },
        )
        .act("reopen cart", open_cart(site, options)?)
        .step(
            "delete every item",
            Step::ClickUntilGone {
                label: "delete".to_string(),
                strategies: SiteProfile::css_list(&site.delete_controls)?,
                max_clicks: DEFAULT_MAX_CLICKS,
                pause: Duration::from_millis(300),
            },
        )
        .step("refresh cart", Step::Reload)
        .step(
            "cart is empty",
            Step::Verify {
                effect: emptied,
                options: options.clone().with_timeout_ms(12_000),
            },
        );
    Ok(scenario)
}
