//! End-to-end journeys against scripted mock pages
//!
//! Each test builds a small page that behaves like the storefront, runs a
//! full scenario through the runner, and checks the report.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use resolute::flows::{self, CartPlan, SiteProfile};
use resolute::{
    ActOptions, ActStep, Convergence, Credentials, Driver, Engine, FakeClock, Intent, MockDriver, MockNode, NodeId,
    Reaction, ResoluteError, Scenario, ScenarioRunner, Step, StepStatus, Strategy, StrategyList, TextPattern,
};
use std::time::Duration;

// ============================================================================
// Page builders
// ============================================================================

struct HelpDesk {
    page: MockDriver,
    banner: NodeId,
    orders: Option<NodeId>,
}

/// Home page with a cookie banner and a header link into the help pages
///
/// Without `with_track_link` the help hub is empty and no orders page exists.
fn storefront(site: &SiteProfile, with_track_link: bool) -> HelpDesk {
    let mut page = MockDriver::new("about:blank");
    let body = page.root();

    let banner = page.append(body, MockNode::new("div").id("sp-cc"));
    let accept = page.append(banner, MockNode::new("input").id("sp-cc-accept"));
    page.on_click(accept, Reaction::Remove(banner));

    let nav = page.append(body, MockNode::new("div").id("nav-xshop"));
    let _ = page.append(nav, MockNode::new("a").text("Today's Deals"));
    let cs = page.append(nav, MockNode::new("a").text("Customer Service"));
    page.on_click(cs, Reaction::Navigate(site.help_url.clone()));

    let help = page.append(body, MockNode::new("div").id("hub").hidden());
    page.on_navigate("/gp/help", Reaction::Show(help));
    let mut orders = None;
    if with_track_link {
        let card = page.append(help, MockNode::new("div").class("fs-hub-card").text("Where's My Stuff"));
        let panel = page.append(help, MockNode::new("div").id("wims").hidden());
        page.on_click(card, Reaction::Show(panel));
        let track = page.append(panel, MockNode::new("a").text("Track your package"));
        page.on_click(
            track,
            Reaction::Navigate("https://www.amazon.com/ap/signin?openid.return_to=orders".into()),
        );

        let heading = page.append(body, MockNode::new("h1").text("Your Orders").hidden());
        page.on_navigate("order-history", Reaction::Show(heading));
        orders = Some(heading);
    }

    HelpDesk { page, banner, orders }
}

struct Shop {
    page: MockDriver,
    count: NodeId,
    quantity: NodeId,
    swatch: NodeId,
    asin_field: NodeId,
    email: NodeId,
    password: NodeId,
}

/// Search, two product pages, cart and sign-in as sections of one document
///
/// Navigation shows the section of the new URL and hides the previous one.
/// No page carries a primary add-to-cart control: the pencil sharpener sells
/// through its offer listing, the scissors through a plain "Add to Cart" button.
fn shop_pages(site: &SiteProfile, plan: &CartPlan) -> Shop {
    let mut page = MockDriver::new("about:blank");
    let body = page.root();
    page.set_attribute(body, "lang", "en-US");

    // Header
    let banner = page.append(body, MockNode::new("div").id("sp-cc"));
    let accept = page.append(banner, MockNode::new("input").id("sp-cc-accept"));
    page.on_click(accept, Reaction::Remove(banner));
    let search = page.append(body, MockNode::new("input").id("twotabsearchtextbox"));
    page.on_submit(search, Reaction::Navigate("https://www.amazon.com/s?k=bostitch".into()));
    let cart_link = page.append(
        body,
        MockNode::new("a").id("nav-cart").attr("href", "/gp/cart/view.html?ref_=nav_cart"),
    );
    page.on_click(cart_link, Reaction::Navigate(site.cart_url.clone()));
    let count = page.append(cart_link, MockNode::new("span").id("nav-cart-count").text("0"));
    let account = page.append(body, MockNode::new("div").id("nav-link-accountList"));
    let greeting = page.append(
        account,
        MockNode::new("a").attr("data-nav-role", "signin").text("Hello, sign in"),
    );
    page.on_click(greeting, Reaction::Navigate(site.signin_url.clone()));

    // Search results
    let results = page.append(body, MockNode::new("div").class("s-main-slot").hidden());
    let item = page.append(
        results,
        MockNode::new("div").class("s-result-item").attr("data-asin", plan.asin.as_str()),
    );
    let h2 = page.append(item, MockNode::new("h2"));
    let link = page.append(h2, MockNode::new("a").class("a-link-normal").text(plan.title.as_str()));
    page.on_click(link, Reaction::Navigate(site.product_page(&plan.asin)));
    page.on_navigate("/s?k=", Reaction::Show(results));

    // Product page, offer listing only
    let product = page.append(body, MockNode::new("div").id("dp-sharpener").hidden());
    let offers_link = page.append(
        product,
        MockNode::new("a").id("buybox-see-all-buying-choices-announce").text("See All Buying Options"),
    );
    let offers = page.append(product, MockNode::new("div").id("aod-container").hidden());
    page.on_click(offers_link, Reaction::Show(offers));
    let offer = page.append(
        offers,
        MockNode::new("input").attr("aria-labelledby", "aod-offer-addToCart-0"),
    );
    page.on_click(offer, Reaction::Increment { target: count, by: 1 });
    page.on_navigate(format!("/dp/{}", plan.asin), Reaction::Show(product));
    page.on_navigate(format!("/dp/{}", plan.asin), Reaction::Hide(results));

    // Variant page: the swatch image has no box and the radio input is hidden
    let variant = page.append(body, MockNode::new("div").id("dp-scissors").hidden());
    let twister = page.append(variant, MockNode::new("div").id("tp-inline-twister-dim-values-container"));
    let list = page.append(twister, MockNode::new("ul"));
    let li = page.append(
        list,
        MockNode::new("li")
            .attr("title", format!("Click to select {}", plan.variant))
            .attr("data-asin", "B07H3QKNYG"),
    );
    let swatch = page.append(li, MockNode::new("span").class("a-button"));
    let _ = page.append(
        swatch,
        MockNode::new("input").class("a-button-input").attr("role", "radio").hidden(),
    );
    let _ = page.append(swatch, MockNode::new("img").attr("alt", plan.variant.as_str()).zero_size());
    let form = page.append(variant, MockNode::new("form").id("addToCart"));
    let asin_field = page.append(
        form,
        MockNode::new("input").attr("name", "ASIN").attr("value", "B07H3QKN2Z").hidden(),
    );
    page.on_click(
        swatch,
        Reaction::SetAttribute {
            node: swatch,
            name: "class".into(),
            value: "a-button a-button-selected".into(),
        },
    );
    page.on_click(
        swatch,
        Reaction::SetAttribute {
            node: asin_field,
            name: "value".into(),
            value: "B07H3QKNYG".into(),
        },
    );
    let add = page.append(form, MockNode::new("button").text("Add to Cart"));
    page.on_click(add, Reaction::Increment { target: count, by: 1 });
    page.on_navigate("/dp/B07H3QKN2Z", Reaction::Show(variant));
    page.on_navigate("/dp/B07H3QKN2Z", Reaction::Hide(product));

    // Cart
    let cart = page.append(body, MockNode::new("div").id("cart").hidden());
    let active = page.append(cart, MockNode::new("div").id("sc-active-cart"));
    let _ = page.append(active, MockNode::new("h1").text("Shopping Cart"));
    let mut quantity = None;
    for asin in [plan.asin.as_str(), "B07H3QKNYG"] {
        let row = page.append(active, MockNode::new("div").class("sc-list-item").attr("data-asin", asin));
        let value = page.append(row, MockNode::new("span").attr("data-a-selector", "value").text("1"));
        let plus = page.append(row, MockNode::new("button").attr("data-a-selector", "increment"));
        page.on_click(plus, Reaction::Increment { target: value, by: 1 });
        let delete = page.append(row, MockNode::new("input").attr("data-action", "delete-active"));
        page.on_click(delete, Reaction::Remove(row));
        quantity.get_or_insert(value);
    }
    let empty = page.append(cart, MockNode::new("h1").text("Your Amazon Cart is empty").hidden());
    page.on_reload(Reaction::Show(empty));
    page.on_navigate("/gp/cart", Reaction::Show(cart));
    page.on_navigate("/gp/cart", Reaction::Hide(variant));

    // Sign-in: email, continue, then password
    let signin = page.append(body, MockNode::new("div").id("ap").hidden());
    let email = page.append(signin, MockNode::new("input").id("ap_email"));
    let proceed = page.append(
        signin,
        MockNode::new("input")
            .class("a-button-input")
            .attr("type", "submit")
            .attr("aria-labelledby", "continue-announce"),
    );
    let password = page.append(signin, MockNode::new("input").id("ap_password").hidden());
    page.on_click(proceed, Reaction::Show(password));
    let submit = page.append(signin, MockNode::new("input").id("signInSubmit"));
    page.on_click(
        submit,
        Reaction::SetText {
            node: greeting,
            text: "Hello, Shopper".into(),
        },
    );
    page.on_click(submit, Reaction::Navigate(site.cart_url.clone()));
    page.on_navigate("/ap/signin", Reaction::Show(signin));
    page.on_navigate("/ap/signin", Reaction::Hide(cart));
    page.on_navigate("/gp/cart", Reaction::Hide(signin));

    Shop {
        page,
        count,
        quantity: quantity.unwrap_or(body),
        swatch,
        asin_field,
        email,
        password,
    }
}

fn fake_engine(page: MockDriver) -> (std::sync::Arc<FakeClock>, Engine<MockDriver>) {
    let (clock, shared) = FakeClock::shared();
    (clock, Engine::with_clock(page, shared))
}

// ============================================================================
// Track package
// ============================================================================

mod track_package_tests {
    use super::*;

    #[test]
    fn test_reaches_order_history_through_sign_in_redirect() {
        let site = SiteProfile::default();
        let desk = storefront(&site, true);
        let (banner, orders) = (desk.banner, desk.orders);
        let (_clock, mut engine) = fake_engine(desk.page);

        let scenario = flows::track_package(&site, &ActOptions::new()).unwrap();
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();

        assert!(report.passed, "failure: {:?}", report.failure);
        assert_eq!(report.count(StepStatus::Failed), 0);
        assert!(!engine.driver().is_attached(banner));
        assert!(engine.driver().url().contains("order-history"));
        assert_eq!(engine.driver().text_of(orders.unwrap()), "Your Orders");
        assert_eq!(engine.driver().cookies().len(), 2);

        let redirect = report.steps.iter().find(|s| s.name == "leave sign-in").unwrap();
        assert!(redirect.message.as_deref().unwrap().starts_with("redirected to"));
    }

    #[test]
    fn test_customer_service_uses_first_strategy() {
        let site = SiteProfile::default();
        let (_clock, mut engine) = fake_engine(storefront(&site, true).page);

        let scenario = flows::track_package(&site, &ActOptions::new()).unwrap();
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();

        let step = report.steps.iter().find(|s| s.name == "open customer service").unwrap();
        assert_eq!(step.status, StepStatus::Passed);
        assert_eq!(step.strategy.as_deref(), Some("a ~ /Customer Service|Help/i"));
        assert_eq!(step.attempts, Some(1));
    }

    #[test]
    fn test_missing_track_link_is_diagnosable() {
        let site = SiteProfile::default();
        let (clock, mut engine) = fake_engine(storefront(&site, false).page);

        let scenario = flows::track_package(&site, &ActOptions::new()).unwrap();
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();

        assert!(!report.passed);
        let failure = report.failure.clone().unwrap();
        assert!(failure.contains("open track your package"));
        assert!(failure.contains("Track your package"));

        let wims = report.steps.iter().find(|s| s.name == "open where's my stuff").unwrap();
        assert_eq!(wims.status, StepStatus::Skipped);
        assert_eq!(report.steps.last().unwrap().status, StepStatus::Failed);
        assert!(report.steps.iter().all(|s| s.name != "destination reached"));

        // The waits ran on virtual time.
        assert!(clock.now_ms() >= 12_000);
        assert!(matches!(report.into_result(), Err(ResoluteError::AssertionFailed { .. })));
    }
}

// ============================================================================
// Cart workflow
// ============================================================================

mod cart_workflow_tests {
    use super::*;

    fn english_site() -> SiteProfile {
        // The mock document root is `body`, so the language marker lives there.
        SiteProfile {
            english_ui: r#"body[lang^="en"]"#.to_string(),
            ..SiteProfile::default()
        }
    }

    fn run(mut shop: Shop, site: &SiteProfile) -> (Shop, resolute::ScenarioReport) {
        let page = std::mem::replace(&mut shop.page, MockDriver::new("about:blank"));
        let (_clock, engine) = fake_engine(page);
        let mut engine = engine.with_credentials(
            Credentials::new()
                .with(Credentials::EMAIL, "shopper@example.test")
                .with(Credentials::PASSWORD, "hunter2"),
        );
        let scenario = flows::cart_workflow(site, &CartPlan::default(), &ActOptions::new()).unwrap();
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();
        shop.page = engine.into_driver();
        (shop, report)
    }

    fn step<'a>(report: &'a resolute::ScenarioReport, name: &str) -> &'a resolute::StepRecord {
        report.steps.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_full_cart_workflow() {
        let site = english_site();
        let (shop, report) = run(shop_pages(&site, &CartPlan::default()), &site);
        assert!(report.passed, "failure: {:?}", report.failure);
        let page = &shop.page;

        // Both products landed in the cart, then the cart was emptied.
        assert_eq!(page.text_of(shop.count), "2");
        assert!(!page.is_attached(shop.quantity));
        assert!(page.page_text().unwrap().contains("Your Amazon Cart is empty"));
        assert_eq!(page.history().iter().filter(|h| *h == "reload").count(), 1);

        let english = step(&report, "force english");
        assert!(english.message.as_deref().unwrap().starts_with("not needed"));
        assert_eq!(step(&report, "raise quantity").message.as_deref(), Some("quantity reached 4 after 3 increment(s)"));
        assert_eq!(step(&report, "delete every item").status, StepStatus::Passed);
        assert_eq!(step(&report, "cart is empty").status, StepStatus::Passed);
    }

    #[test]
    fn test_offer_listing_stands_in_for_missing_button() {
        let site = english_site();
        let (_shop, report) = run(shop_pages(&site, &CartPlan::default()), &site);

        let offers = step(&report, "open buying choices for product");
        assert_eq!(offers.status, StepStatus::Passed);
        assert_eq!(offers.strategy.as_deref(), Some("a#buybox-see-all-buying-choices-announce"));
        let add = step(&report, "add product to cart");
        assert_eq!(add.strategy.as_deref(), Some(site.offer_add_to_cart.as_str()));

        // The variant page has a button, but no offer link: the optional click is skipped.
        assert_eq!(step(&report, "open buying choices for variant").status, StepStatus::Skipped);
        let add = step(&report, "add variant to cart");
        assert_eq!(add.strategy.as_deref(), Some("input, button ~ /^Add to Cart$/i"));
    }

    #[test]
    fn test_hidden_swatch_clicked_through_visible_ancestor() {
        let site = english_site();
        let (shop, report) = run(shop_pages(&site, &CartPlan::default()), &site);

        let colour = step(&report, "select colour");
        assert_eq!(colour.status, StepStatus::Passed);
        let label = colour.strategy.as_deref().unwrap();
        assert!(label.contains(r#"li[title*="Yellow, Grey, Blue"]"#), "{label}");
        assert!(shop.page.clicked().iter().any(|c| c.to_string() == format!("m{}", shop.swatch)));
        assert_eq!(
            shop.page.attribute_of(shop.asin_field, "value").as_deref(),
            Some("B07H3QKNYG")
        );
    }

    #[test]
    fn test_swatch_without_asin_propagation_fails() {
        let site = english_site();
        let mut shop = shop_pages(&site, &CartPlan::default());
        // Drop the form update: the swatch still turns selected.
        shop.page.set_attribute(shop.asin_field, "name", "ASIN-stale");
        let (_shop, report) = run(shop, &site);

        assert!(!report.passed);
        let failure = report.failure.unwrap();
        assert!(failure.contains("select colour"), "{failure}");
        assert!(failure.contains("B07H3QKNYG not carried by any sink"), "{failure}");
    }

    #[test]
    fn test_sign_in_fields_in_order() {
        let site = english_site();
        let (shop, report) = run(shop_pages(&site, &CartPlan::default()), &site);
        let page = &shop.page;

        assert_eq!(page.value_of(shop.email).as_deref(), Some("shopper@example.test"));
        assert_eq!(page.value_of(shop.password).as_deref(), Some("hunter2"));
        let history = page.history();
        let typed = |node: NodeId| history.iter().position(|h| *h == format!("type:m{node}")).unwrap();
        assert!(typed(shop.email) < typed(shop.password));
        assert_eq!(step(&report, "continue").status, StepStatus::Passed);
        assert_eq!(step(&report, "signed in on cart").status, StepStatus::Passed);
    }

    #[test]
    fn test_non_english_page_is_reloaded() {
        let site = SiteProfile::default();
        let (shop, report) = run(shop_pages(&site, &CartPlan::default()), &site);

        assert!(report.passed, "failure: {:?}", report.failure);
        assert_eq!(step(&report, "force english").message.as_deref(), Some("ran reload"));
        assert_eq!(shop.page.history().iter().filter(|h| *h == "reload").count(), 2);
    }
}

// ============================================================================
// Counter convergence
// ============================================================================

mod convergence_tests {
    use super::*;

    fn stepper_page(start: i64) -> (MockDriver, NodeId) {
        let mut page = MockDriver::new("https://www.amazon.com/gp/cart/view.html");
        let body = page.root();
        let row = page.append(body, MockNode::new("div").attr("data-asin", "B00125KXGI"));
        let value = page.append(
            row,
            MockNode::new("span").attr("data-a-selector", "value").text(start.to_string()),
        );
        let plus = page.append(row, MockNode::new("button").attr("data-a-selector", "increment"));
        page.on_click(plus, Reaction::Increment { target: value, by: 1 });
        (page, value)
    }

    fn quantity(target: i64) -> Convergence {
        Convergence::new(
            "quantity",
            StrategyList::of(Strategy::css(r#"[data-asin="B00125KXGI"] [data-a-selector="value"]"#)),
            StrategyList::of(Strategy::css(r#"[data-asin="B00125KXGI"] [data-a-selector="increment"]"#)),
            target,
        )
        .with_max_iterations(2)
        .with_options(ActOptions::new().with_timeout_ms(0))
    }

    #[test]
    fn test_zero_to_four_through_runner() {
        let (page, value) = stepper_page(0);
        let (_clock, mut engine) = fake_engine(page);

        let scenario = Scenario::new("raise quantity").step("raise", Step::Converge(quantity(4)));
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();

        assert!(report.passed);
        assert_eq!(engine.driver().text_of(value), "4");
        assert_eq!(
            report.steps[0].message.as_deref(),
            Some("quantity reached 4 after 4 increment(s)")
        );
    }

    #[test]
    fn test_dead_increment_fails_step() {
        let mut page = MockDriver::new("https://www.amazon.com/gp/cart/view.html");
        let body = page.root();
        let row = page.append(body, MockNode::new("div").attr("data-asin", "B00125KXGI"));
        let _ = page.append(row, MockNode::new("span").attr("data-a-selector", "value").text("1"));
        let _ = page.append(row, MockNode::new("button").attr("data-a-selector", "increment"));
        let (_clock, mut engine) = fake_engine(page);

        let scenario = Scenario::new("raise quantity").step("raise", Step::Converge(quantity(4)));
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();

        assert!(!report.passed);
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        // Bound raised to needed + 1 = 4 clicks, none of which moved the counter.
        assert_eq!(engine.driver().clicked().len(), 4);
    }
}

// ============================================================================
// Overlays and effects
// ============================================================================

mod effect_tests {
    use super::*;

    #[test]
    fn test_sweep_on_clean_page_clicks_nothing() {
        let mut page = MockDriver::new("https://www.amazon.com/");
        let body = page.root();
        let _ = page.append(body, MockNode::new("button").text("Add to Cart"));
        let (_clock, mut engine) = fake_engine(page);

        let report = engine.dismiss_overlays(&resolute::OverlaySweep::default());
        assert_eq!(report.clicks(), 0);
        assert!(engine.driver().clicked().is_empty());
    }

    fn cart_button(by: i64) -> Engine<MockDriver> {
        let mut page = MockDriver::new("https://www.amazon.com/dp/B00125KXGI");
        let body = page.root();
        let count = page.append(body, MockNode::new("span").id("nav-cart-count").text("2"));
        let add = page.append(body, MockNode::new("input").id("add-to-cart-button"));
        if by != 0 {
            page.on_click(add, Reaction::Increment { target: count, by });
        }
        fake_engine(page).1
    }

    fn add_to_cart(engine: &mut Engine<MockDriver>) -> resolute::Outcome {
        let options = ActOptions::new()
            .with_timeout(Duration::ZERO)
            .expecting(resolute::Effect::counter_increment("#nav-cart-count"));
        engine
            .locate_and_act(
                &Intent::click("add to cart"),
                &StrategyList::of(Strategy::css("#add-to-cart-button")),
                &options,
            )
            .unwrap()
    }

    #[test]
    fn test_counter_increment_confirms_live_button() {
        let mut engine = cart_button(1);
        assert!(add_to_cart(&mut engine).is_success());
    }

    #[test]
    fn test_counter_unchanged_is_action_failed() {
        let mut engine = cart_button(0);
        let outcome = add_to_cart(&mut engine);
        assert!(matches!(outcome, resolute::Outcome::ActionFailed { .. }));
        assert_eq!(outcome.resolution().unwrap().strategy_index, 0);
    }

    #[test]
    fn test_assertion_scenario_reports_missing_text() {
        let page = MockDriver::new("https://www.amazon.com/gp/cart/view.html");
        let (_clock, mut engine) = fake_engine(page);
        let scenario = Scenario::new("empty cart").act(
            "cart is empty",
            ActStep::new(
                Intent::assert_text(TextPattern::contains("Your Amazon Cart is empty")),
                StrategyList::of(Strategy::css("h1, h2")),
            )
            .with_options(ActOptions::new().with_timeout_ms(500)),
        );
        let report = ScenarioRunner::new().run(&mut engine, &scenario).unwrap();
        assert!(!report.passed);
        assert!(report.failure.unwrap().contains("assertion failed"));
    }
}
