//! In-memory page for driving the engine without a browser.
//!
//! [`MockDriver`] holds a small element tree, answers a practical subset of CSS
//! selectors, and runs scripted [`Reaction`]s when elements are clicked,
//! submitted, or when enough queries have happened. Every interaction is
//! recorded in a call history for verification.
//!
//! Supported selectors: type, `*`, `#id`, `.class`, `[attr]`, `[attr=v]`,
//! `[attr*=v]`, `[attr^=v]`, `[attr$=v]`, descendant and `>` combinators, and
//! `,` groups.

use crate::driver::{Cookie, Driver};
use crate::result::{ResoluteError, ResoluteResult};
use crate::snapshot::{BoundingBox, ElementHandle, ElementRef};
use crate::stepper::parse_leading_int;
use crate::strategy::{split_groups, Selector};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// Index of a node in the mock tree
pub type NodeId = usize;

/// Element definition for the mock tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    display_none: bool,
    visibility_hidden: bool,
    zero_size: bool,
    offscreen: bool,
}

impl MockNode {
    /// Create a visible element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: None,
            display_none: false,
            visibility_hidden: false,
            zero_size: false,
            offscreen: false,
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let entry = self.attributes.entry("class".to_string()).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(class);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the form value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// `display: none`
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.display_none = true;
        self
    }

    /// `visibility: hidden`
    #[must_use]
    pub const fn invisible(mut self) -> Self {
        self.visibility_hidden = true;
        self
    }

    /// Laid out with zero width
    #[must_use]
    pub const fn zero_size(mut self) -> Self {
        self.zero_size = true;
        self
    }

    /// Positioned far off the left edge
    #[must_use]
    pub const fn offscreen(mut self) -> Self {
        self.offscreen = true;
        self
    }
}

/// Scripted page mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Add `by` to the integer shown in `target`
    Increment {
        /// Counter node
        target: NodeId,
        /// Amount
        by: i64,
    },
    /// Change the page URL
    Navigate(String),
    /// Detach a node and its subtree
    Remove(NodeId),
    /// Clear `display: none`
    Show(NodeId),
    /// Set `display: none`
    Hide(NodeId),
    /// Set an attribute
    SetAttribute {
        /// Node
        node: NodeId,
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
    /// Replace own text
    SetText {
        /// Node
        node: NodeId,
        /// New text
        text: String,
    },
    /// Run `reaction` once `queries` more queries have been answered
    After {
        /// Queries to wait
        queries: u32,
        /// Deferred reaction
        reaction: Box<Reaction>,
    },
}

impl Reaction {
    /// Defer a reaction by a number of queries
    #[must_use]
    pub fn after(queries: u32, reaction: Self) -> Self {
        Self::After {
            queries,
            reaction: Box::new(reaction),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: MockNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    removed: bool,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    slots: Vec<Slot>,
    on_click: BTreeMap<NodeId, Vec<Reaction>>,
    on_submit: BTreeMap<NodeId, Vec<Reaction>>,
    on_navigate: Vec<(String, Reaction)>,
    on_reload: Vec<Reaction>,
    pending: Vec<(u64, Reaction)>,
    queries: u64,
    history: Vec<String>,
    cookies: Vec<Cookie>,
    failing_selectors: BTreeSet<String>,
    failing_clicks: BTreeSet<NodeId>,
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    state: RefCell<MockState>,
}

impl MockDriver {
    /// Create a page at `url` with an empty `body`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let state = MockState {
            url: url.into(),
            slots: vec![Slot {
                node: MockNode::new("body"),
                parent: None,
                children: Vec::new(),
                removed: false,
            }],
            ..MockState::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    /// The `body` node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        0
    }

    /// Append a child and return its id
    pub fn append(&mut self, parent: NodeId, node: MockNode) -> NodeId {
        self.state.get_mut().append(parent, node)
    }

    /// Find a live node by its `id` attribute
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let state = self.state.borrow();
        (0..state.slots.len())
            .find(|&n| state.is_attached(n) && state.slots[n].node.attributes.get("id").map(String::as_str) == Some(id))
    }

    /// Reference the engine sees for a node
    #[must_use]
    pub fn reference(&self, node: NodeId) -> ElementRef {
        reference_of(node)
    }

    /// Replace own text
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(slot) = self.state.get_mut().slots.get_mut(node) {
            slot.node.text = text.into();
        }
    }

    /// Toggle `display: none`
    pub fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(slot) = self.state.get_mut().slots.get_mut(node) {
            slot.node.display_none = !visible;
        }
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(slot) = self.state.get_mut().slots.get_mut(node) {
            let _ = slot.node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Detach a node and its subtree
    pub fn remove(&mut self, node: NodeId) {
        self.state.get_mut().apply(Reaction::Remove(node));
    }

    /// Run `reaction` every time `node` is clicked
    pub fn on_click(&mut self, node: NodeId, reaction: Reaction) {
        self.state.get_mut().on_click.entry(node).or_default().push(reaction);
    }

    /// Run `reaction` when text typed into `node` is submitted
    pub fn on_submit(&mut self, node: NodeId, reaction: Reaction) {
        self.state.get_mut().on_submit.entry(node).or_default().push(reaction);
    }

    /// Run `reaction` whenever the URL changes to one containing `fragment`
    pub fn on_navigate(&mut self, fragment: impl Into<String>, reaction: Reaction) {
        self.state.get_mut().on_navigate.push((fragment.into(), reaction));
    }

    /// Run `reaction` on every reload
    pub fn on_reload(&mut self, reaction: Reaction) {
        self.state.get_mut().on_reload.push(reaction);
    }

    /// Run `reaction` once `queries` more queries have been answered
    pub fn schedule(&mut self, queries: u32, reaction: Reaction) {
        self.state.get_mut().apply(Reaction::after(queries, reaction));
    }

    /// Make every query for `css` fail
    pub fn fail_selector(&mut self, css: impl Into<String>) {
        let _ = self.state.get_mut().failing_selectors.insert(css.into());
    }

    /// Make every click on `node` fail
    pub fn fail_click(&mut self, node: NodeId) {
        let _ = self.state.get_mut().failing_clicks.insert(node);
    }

    /// Own text plus descendant text
    #[must_use]
    pub fn text_of(&self, node: NodeId) -> String {
        self.state.borrow().text_content(node)
    }

    /// Form value
    #[must_use]
    pub fn value_of(&self, node: NodeId) -> Option<String> {
        self.state.borrow().slots.get(node).and_then(|s| s.node.value.clone())
    }

    /// Attribute value
    #[must_use]
    pub fn attribute_of(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .borrow()
            .slots
            .get(node)
            .and_then(|s| s.node.attributes.get(name).cloned())
    }

    /// Whether the node is still in the tree
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.state.borrow().is_attached(node)
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> String {
        self.state.borrow().url.clone()
    }

    /// Cookies set so far
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        self.state.borrow().cookies.clone()
    }

    /// Call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().history.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state.borrow().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Elements clicked, in order
    #[must_use]
    pub fn clicked(&self) -> Vec<ElementRef> {
        self.state
            .borrow()
            .history
            .iter()
            .filter_map(|c| c.strip_prefix("click:"))
            .map(ElementRef::new)
            .collect()
    }

    /// Number of `query_all` calls answered
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.state.borrow().queries
    }
}

impl MockState {
    fn append(&mut self, parent: NodeId, node: MockNode) -> NodeId {
        let id = self.slots.len();
        self.slots.push(Slot {
            node,
            parent: Some(parent),
            children: Vec::new(),
            removed: false,
        });
        if let Some(p) = self.slots.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    fn ancestors_of(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.slots.get(node).and_then(|s| s.parent);
        while let Some(p) = cur {
            out.push(p);
            cur = self.slots[p].parent;
        }
        out
    }

    fn is_attached(&self, node: NodeId) -> bool {
        match self.slots.get(node) {
            Some(slot) if !slot.removed => self.ancestors_of(node).iter().all(|&a| !self.slots[a].removed),
            _ => false,
        }
    }

    fn lineage(&self, node: NodeId) -> impl Iterator<Item = &Slot> + '_ {
        std::iter::once(node)
            .chain(self.ancestors_of(node))
            .filter_map(|n| self.slots.get(n))
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(node, false, &mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, node: NodeId, rendered_only: bool, parts: &mut Vec<String>) {
        let Some(slot) = self.slots.get(node) else {
            return;
        };
        if slot.removed || (rendered_only && slot.node.display_none) {
            return;
        }
        let own = slot.node.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !own.is_empty() {
            parts.push(own);
        }
        for &child in &slot.children {
            self.collect_text(child, rendered_only, parts);
        }
    }

    fn handle(&self, node: NodeId) -> ElementHandle {
        let slot = &self.slots[node];
        let display_none = self.lineage(node).any(|s| s.node.display_none);
        let visibility_hidden = self.lineage(node).any(|s| s.node.visibility_hidden);
        let bounding_box = if display_none {
            None
        } else {
            let x = if slot.node.offscreen { -9999.0 } else { 0.0 };
            let width = if slot.node.zero_size { 0.0 } else { 100.0 };
            #[allow(clippy::cast_precision_loss)]
            let y = (node as f32) * 20.0;
            Some(BoundingBox::new(x, y, width, 20.0))
        };
        ElementHandle {
            reference: reference_of(node),
            tag: slot.node.tag.clone(),
            text: self.text_content(node),
            attributes: slot.node.attributes.clone(),
            value: slot.node.value.clone(),
            bounding_box,
            display_none,
            visibility_hidden,
        }
    }

    fn resolve(&self, element: &ElementRef) -> ResoluteResult<NodeId> {
        element
            .as_str()
            .strip_prefix('m')
            .and_then(|n| n.parse::<NodeId>().ok())
            .filter(|&n| self.is_attached(n))
            .ok_or_else(|| ResoluteError::StaleElement {
                reference: element.to_string(),
            })
    }

    fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
        let hooks: Vec<Reaction> = self
            .on_navigate
            .iter()
            .filter(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, r)| r.clone())
            .collect();
        for r in hooks {
            self.apply(r);
        }
    }

    fn apply(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Increment { target, by } => {
                if let Some(slot) = self.slots.get_mut(target) {
                    let current = parse_leading_int(&slot.node.text).unwrap_or(0);
                    slot.node.text = current.saturating_add(by).to_string();
                }
            }
            Reaction::Navigate(url) => self.set_url(&url),
            Reaction::Remove(node) => {
                if let Some(slot) = self.slots.get_mut(node) {
                    slot.removed = true;
                }
            }
            Reaction::Show(node) => {
                if let Some(slot) = self.slots.get_mut(node) {
                    slot.node.display_none = false;
                }
            }
            Reaction::Hide(node) => {
                if let Some(slot) = self.slots.get_mut(node) {
                    slot.node.display_none = true;
                }
            }
            Reaction::SetAttribute { node, name, value } => {
                if let Some(slot) = self.slots.get_mut(node) {
                    let _ = slot.node.attributes.insert(name, value);
                }
            }
            Reaction::SetText { node, text } => {
                if let Some(slot) = self.slots.get_mut(node) {
                    slot.node.text = text;
                }
            }
            Reaction::After { queries, reaction } => {
                self.pending.push((self.queries + u64::from(queries), *reaction));
            }
        }
    }

    fn fire(&mut self, reactions: Option<Vec<Reaction>>) {
        for r in reactions.unwrap_or_default() {
            self.apply(r);
        }
    }

    fn tick_query(&mut self) {
        self.queries += 1;
        let now = self.queries;
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.pending = rest;
        for (_, r) in due {
            self.apply(r);
        }
    }

    fn matches(&self, node: NodeId, complex: &[(Combinator, Compound)]) -> bool {
        let Some(((combinator, compound), rest)) = complex.split_last() else {
            return true;
        };
        if !compound.matches(&self.slots[node].node) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        match combinator {
            Combinator::Child => self.slots[node].parent.is_some_and(|p| self.matches(p, rest)),
            Combinator::Descendant => self.ancestors_of(node).into_iter().any(|a| self.matches(a, rest)),
        }
    }

    fn document_order(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let slot = &self.slots[node];
        if slot.removed {
            return;
        }
        out.push(node);
        for &child in &slot.children {
            self.document_order(child, out);
        }
    }
}

fn reference_of(node: NodeId) -> ElementRef {
    ElementRef::new(format!("m{node}"))
}

impl Driver for MockDriver {
    fn navigate(&mut self, url: &str) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        state.history.push(format!("navigate:{url}"));
        state.set_url(url);
        Ok(())
    }

    fn current_url(&self) -> ResoluteResult<String> {
        Ok(self.state.borrow().url.clone())
    }

    fn query_all(&self, selector: &Selector) -> ResoluteResult<Vec<ElementHandle>> {
        let css = selector.to_css();
        let mut state = self.state.borrow_mut();
        state.tick_query();
        if state.failing_selectors.contains(&css) {
            return Err(ResoluteError::driver("query_all", format!("query for `{css}` failed")));
        }
        let groups = parse_selector(&css)?;
        let mut order = Vec::new();
        state.document_order(0, &mut order);
        Ok(order
            .into_iter()
            .filter(|&n| groups.iter().any(|g| state.matches(n, g)))
            .map(|n| state.handle(n))
            .collect())
    }

    fn ancestors(&self, element: &ElementRef) -> ResoluteResult<Vec<ElementHandle>> {
        let state = self.state.borrow();
        let node = state.resolve(element)?;
        Ok(state.ancestors_of(node).into_iter().map(|a| state.handle(a)).collect())
    }

    fn click(&mut self, element: &ElementRef) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        let node = state.resolve(element)?;
        if state.failing_clicks.contains(&node) {
            return Err(ResoluteError::driver("click", format!("{element} is covered by another element")));
        }
        state.history.push(format!("click:{element}"));
        let reactions = state.on_click.get(&node).cloned();
        state.fire(reactions);
        Ok(())
    }

    fn type_text(&mut self, element: &ElementRef, text: &str, submit: bool) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        let node = state.resolve(element)?;
        state.slots[node].node.value = Some(text.to_string());
        state.history.push(format!("type:{element}"));
        if submit {
            state.history.push(format!("submit:{element}"));
            let reactions = state.on_submit.get(&node).cloned();
            state.fire(reactions);
        }
        Ok(())
    }

    fn scroll_into_view(&mut self, element: &ElementRef) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        let _ = state.resolve(element)?;
        state.history.push(format!("scroll:{element}"));
        Ok(())
    }

    fn page_text(&self) -> ResoluteResult<String> {
        let state = self.state.borrow();
        let mut parts = Vec::new();
        state.collect_text(0, true, &mut parts);
        Ok(parts.join(" "))
    }

    fn set_cookie(&mut self, cookie: &Cookie) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        state.history.push(format!("cookie:{}", cookie.name));
        state.cookies.retain(|c| c.name != cookie.name);
        state.cookies.push(cookie.clone());
        Ok(())
    }

    fn reload(&mut self) -> ResoluteResult<()> {
        let state = self.state.get_mut();
        state.history.push("reload".to_string());
        let reactions = Some(state.on_reload.clone());
        state.fire(reactions);
        Ok(())
    }
}

// =============================================================================
// CSS SUBSET
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSel {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSel>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, node: &MockNode) -> bool {
        if self.tag.as_deref().is_some_and(|t| t != node.tag) {
            return false;
        }
        let attr = |name: &str| node.attributes.get(name).map(String::as_str);
        if !self.ids.iter().all(|id| attr("id") == Some(id.as_str())) {
            return false;
        }
        let classes: Vec<&str> = attr("class").map(|c| c.split_whitespace().collect()).unwrap_or_default();
        if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
        self.attrs.iter().all(|a| {
            let actual = if a.name == "value" {
                attr("value").or(node.value.as_deref())
            } else {
                attr(&a.name)
            };
            match (actual, a.op) {
                (None, _) => false,
                (Some(_), AttrOp::Exists) => true,
                (Some(v), AttrOp::Equals) => v == a.value,
                (Some(v), AttrOp::Contains) => v.contains(a.value.as_str()),
                (Some(v), AttrOp::Prefix) => v.starts_with(a.value.as_str()),
                (Some(v), AttrOp::Suffix) => v.ends_with(a.value.as_str()),
            }
        })
    }
}

type Complex = Vec<(Combinator, Compound)>;

fn unsupported(css: &str, why: &str) -> ResoluteError {
    ResoluteError::driver("query_all", format!("unsupported selector `{css}`: {why}"))
}

fn parse_selector(css: &str) -> ResoluteResult<Vec<Complex>> {
    split_groups(css)
        .into_iter()
        .map(|group| parse_complex(css, group.trim()))
        .collect()
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_complex(css: &str, group: &str) -> ResoluteResult<Complex> {
    let chars: Vec<char> = group.chars().collect();
    let mut pos = 0;
    let mut out: Complex = Vec::new();
    let mut combinator = Combinator::Descendant;

    while pos < chars.len() {
        if chars[pos].is_whitespace() {
            pos += 1;
            continue;
        }
        if chars[pos] == '>' {
            if out.is_empty() {
                return Err(unsupported(css, "leading combinator"));
            }
            combinator = Combinator::Child;
            pos += 1;
            continue;
        }
        let compound = parse_compound(css, &chars, &mut pos)?;
        out.push((combinator, compound));
        combinator = Combinator::Descendant;
    }

    if out.is_empty() {
        return Err(unsupported(css, "empty selector"));
    }
    Ok(out)
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(css: &str, chars: &[char], pos: &mut usize) -> ResoluteResult<Compound> {
    let mut compound = Compound::default();
    let mut universal = false;

    while *pos < chars.len() && !chars[*pos].is_whitespace() && chars[*pos] != '>' {
        match chars[*pos] {
            '*' => {
                universal = true;
                *pos += 1;
            }
            '#' => {
                *pos += 1;
                let id = read_ident(chars, pos);
                if id.is_empty() {
                    return Err(unsupported(css, "empty id"));
                }
                compound.ids.push(id);
            }
            '.' => {
                *pos += 1;
                let class = read_ident(chars, pos);
                if class.is_empty() {
                    return Err(unsupported(css, "empty class"));
                }
                compound.classes.push(class);
            }
            '[' => {
                *pos += 1;
                compound.attrs.push(parse_attr(css, chars, pos)?);
            }
            c if is_ident(c) => {
                compound.tag = Some(read_ident(chars, pos).to_ascii_lowercase());
            }
            c => return Err(unsupported(css, &format!("unexpected `{c}`"))),
        }
    }

    if compound.is_empty() && !universal {
        return Err(unsupported(css, "empty compound"));
    }
    Ok(compound)
}

fn parse_attr(css: &str, chars: &[char], pos: &mut usize) -> ResoluteResult<AttrSel> {
    let name = read_ident(chars, pos);
    if name.is_empty() {
        return Err(unsupported(css, "empty attribute name"));
    }
    let op = match chars.get(*pos) {
        Some(']') => {
            *pos += 1;
            return Ok(AttrSel {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            });
        }
        Some('=') => {
            *pos += 1;
            AttrOp::Equals
        }
        Some(c @ ('*' | '^' | '$')) if chars.get(*pos + 1) == Some(&'=') => {
            let op = match c {
                '*' => AttrOp::Contains,
                '^' => AttrOp::Prefix,
                _ => AttrOp::Suffix,
            };
            *pos += 2;
            op
        }
        _ => return Err(unsupported(css, "unsupported attribute operator")),
    };

    let value = match chars.get(*pos) {
        Some(&q @ ('"' | '\'')) => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != q {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err(unsupported(css, "unterminated string"));
            }
            let v: String = chars[start..*pos].iter().collect();
            *pos += 1;
            v
        }
        _ => read_ident(chars, pos),
    };

    if chars.get(*pos) != Some(&']') {
        return Err(unsupported(css, "expected `]`"));
    }
    *pos += 1;
    Ok(AttrSel { name, op, value })
}
