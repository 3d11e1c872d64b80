//! HTML Fragment Model
//!
//! The server hands back rendered HTML for the history view. The page
//! model needs a handful of DOM-style operations on it (closest ancestor,
//! remove, replace inner content, add classes), so this module keeps the
//! markup as a string plus an element tree recovered by a tolerant tag
//! scanner. It is not a general HTML parser: comments, scripts and
//! malformed nesting are handled only as far as server templates need.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#)
            .expect("tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

/// One element recovered from the markup
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    open: Range<usize>,
    inner: Range<usize>,
    outer: Range<usize>,
    parent: Option<usize>,
    self_closing: bool,
}

impl Element {
    /// Lowercase tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Byte offset of the opening tag; stable across edits made after it
    pub fn start(&self) -> usize {
        self.outer.start
    }

    fn render_open_tag(&self) -> String {
        let mut tag = format!("<{}", self.name);
        for (key, value) in &self.attrs {
            tag.push(' ');
            tag.push_str(key);
            tag.push_str("=\"");
            tag.push_str(&value.replace('"', "&quot;"));
            tag.push('"');
        }
        tag.push_str(if self.self_closing { "/>" } else { ">" });
        tag
    }

    fn set_attr(&mut self, name: &str, value: String) {
        match self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

/// A mutable piece of HTML with its element tree
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    html: String,
    elements: Vec<Element>,
}

impl Fragment {
    pub fn parse(html: impl Into<String>) -> Self {
        let html = html.into();
        let elements = scan(&html);
        Self { html, elements }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, idx: usize) -> Option<&Element> {
        self.elements.get(idx)
    }

    /// First element in document order matching `pred`
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.elements.iter().position(pred)
    }

    /// Element whose opening tag starts at `offset`
    pub fn at(&self, offset: usize) -> Option<usize> {
        self.elements.iter().position(|el| el.outer.start == offset)
    }

    /// Nearest element matching `pred`, starting with `idx` itself
    pub fn closest(&self, idx: usize, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        let mut current = Some(idx);
        while let Some(i) = current {
            let el = self.elements.get(i)?;
            if pred(el) {
                return Some(i);
            }
            current = el.parent;
        }
        None
    }

    pub fn inner_html(&self, idx: usize) -> &str {
        self.elements
            .get(idx)
            .map(|el| &self.html[el.inner.clone()])
            .unwrap_or("")
    }

    pub fn child_element_count(&self, idx: usize) -> usize {
        self.elements
            .iter()
            .filter(|el| el.parent == Some(idx))
            .count()
    }

    /// Remove an element together with its content
    pub fn remove(&mut self, idx: usize) {
        if let Some(el) = self.elements.get(idx) {
            let range = el.outer.clone();
            self.splice(range, "");
        }
    }

    pub fn set_inner_html(&mut self, idx: usize, html: &str) {
        if let Some(el) = self.elements.get(idx) {
            let range = el.inner.clone();
            self.splice(range, html);
        }
    }

    pub fn set_attr(&mut self, idx: usize, name: &str, value: &str) {
        if let Some(el) = self.elements.get(idx) {
            let mut el = el.clone();
            el.set_attr(name, value.to_string());
            let range = el.open.clone();
            self.splice(range, &el.render_open_tag());
        }
    }

    /// Add `classes` to every `tag` element missing them; returns how many
    /// elements changed
    pub fn add_classes(&mut self, tag: &str, classes: &[&str]) -> usize {
        let mut edits = Vec::new();
        for el in self.elements.iter().filter(|el| el.name == tag) {
            let missing: Vec<&str> = classes
                .iter()
                .copied()
                .filter(|c| !el.has_class(c))
                .collect();
            if missing.is_empty() {
                continue;
            }

            let mut el = el.clone();
            let mut class_list: Vec<&str> = el.classes().collect();
            class_list.extend(missing);
            let joined = class_list.join(" ");
            el.set_attr("class", joined);
            edits.push((el.open.clone(), el.render_open_tag()));
        }

        let changed = edits.len();
        // Back to front so earlier offsets stay valid
        for (range, tag) in edits.into_iter().rev() {
            self.html.replace_range(range, &tag);
        }
        if changed > 0 {
            self.reparse();
        }
        changed
    }

    /// Values a form would submit: named `input` and `textarea` fields in
    /// document order. Buttons, file inputs and unchecked boxes are left out.
    pub fn form_fields(&self, form: usize) -> Vec<(String, String)> {
        if form >= self.elements.len() {
            return Vec::new();
        }

        self.elements
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != form && self.is_descendant(*i, form))
            .filter_map(|(_, el)| {
                let name = el.attr("name")?;
                let value = match el.name.as_str() {
                    "input" if !is_submitted_input(el) => return None,
                    "input" => el.attr("value").unwrap_or("").to_string(),
                    "textarea" => self.html[el.inner.clone()].to_string(),
                    _ => return None,
                };
                Some((name.to_string(), value))
            })
            .collect()
    }

    /// Value of the first `<input name="...">`, e.g. a hidden CSRF field
    pub fn input_value(&self, name: &str) -> Option<String> {
        self.elements
            .iter()
            .find(|el| el.name == "input" && el.attr("name") == Some(name))
            .and_then(|el| el.attr("value"))
            .map(|v| v.to_string())
    }

    fn is_descendant(&self, idx: usize, ancestor: usize) -> bool {
        let mut current = self.elements.get(idx).and_then(|el| el.parent);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.elements.get(i).and_then(|el| el.parent);
        }
        false
    }

    fn splice(&mut self, range: Range<usize>, replacement: &str) {
        self.html.replace_range(range, replacement);
        self.reparse();
    }

    fn reparse(&mut self) {
        self.elements = scan(&self.html);
    }
}

fn is_submitted_input(el: &Element) -> bool {
    let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
    match kind.as_str() {
        "submit" | "button" | "reset" | "image" | "file" => false,
        "checkbox" | "radio" => el.attr("checked").is_some(),
        _ => true,
    }
}

fn scan(html: &str) -> Vec<Element> {
    let mut elements: Vec<Element> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for caps in tag_regex().captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let explicit_self_close = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        if closing {
            // Unmatched closing tags are ignored
            let Some(pos) = stack.iter().rposition(|&i| elements[i].name == name) else {
                continue;
            };
            // Descendants left open are closed implicitly here
            while stack.len() > pos + 1 {
                if let Some(i) = stack.pop() {
                    elements[i].inner.end = whole.start();
                    elements[i].outer.end = whole.start();
                }
            }
            if let Some(i) = stack.pop() {
                elements[i].inner.end = whole.start();
                elements[i].outer.end = whole.end();
            }
            continue;
        }

        let attrs = caps
            .get(3)
            .map(|m| parse_attrs(m.as_str()))
            .unwrap_or_default();
        let idx = elements.len();
        elements.push(Element {
            attrs,
            open: whole.range(),
            inner: whole.end()..whole.end(),
            outer: whole.range(),
            parent: stack.last().copied(),
            self_closing: explicit_self_close,
            name,
        });

        let is_void = explicit_self_close || VOID_ELEMENTS.contains(&elements[idx].name.as_str());
        if !is_void {
            stack.push(idx);
        }
    }

    for i in stack {
        elements[i].inner.end = html.len();
        elements[i].outer.end = html.len();
    }

    elements
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    attr_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((key, value))
        })
        .collect()
}

/// Escape text for inclusion in markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"<div class="table-responsive">
<table class="table"><tbody>
<tr><td>Mon</td><td><form class="delete-checkin-form" action="/checkin/delete/1" method="post"><input type="hidden" name="csrf_token" value="tok"><button type="submit">Delete</button></form></td></tr>
<tr><td>Tue</td><td><form class="delete-checkin-form" action="/checkin/delete/2" method="post"><input type="hidden" name="csrf_token" value="tok"></form></td></tr>
</tbody></table>
</div>"#;

    fn form_for(fragment: &Fragment, action: &str) -> usize {
        fragment
            .find(|el| el.name() == "form" && el.attr("action") == Some(action))
            .unwrap()
    }

    #[test]
    fn test_tree_structure() {
        let fragment = Fragment::parse(TABLE);
        let tbody = fragment.find(|el| el.name() == "tbody").unwrap();
        assert_eq!(fragment.child_element_count(tbody), 2);

        let form = form_for(&fragment, "/checkin/delete/2");
        let row = fragment.closest(form, |el| el.name() == "tr").unwrap();
        assert_eq!(fragment.element(row).unwrap().parent(), Some(tbody));
        assert!(fragment.inner_html(row).contains("Tue"));
    }

    #[test]
    fn test_void_and_self_closing_tags_do_not_nest() {
        let fragment = Fragment::parse(r#"<p><img src="a.jpg"><br/><span>x</span></p>"#);
        let p = fragment.find(|el| el.name() == "p").unwrap();
        assert_eq!(fragment.child_element_count(p), 3);
    }

    #[test]
    fn test_remove_row() {
        let mut fragment = Fragment::parse(TABLE);
        let form = form_for(&fragment, "/checkin/delete/1");
        let row = fragment.closest(form, |el| el.name() == "tr").unwrap();
        fragment.remove(row);

        assert!(!fragment.html().contains("Mon"));
        assert!(fragment.html().contains("Tue"));
        let tbody = fragment.find(|el| el.name() == "tbody").unwrap();
        assert_eq!(fragment.child_element_count(tbody), 1);
    }

    #[test]
    fn test_closest_card_with_nested_divs() {
        let html = r#"<div class="d-md-none"><div class="card mb-2"><div class="card-body"><p>Note</p><form class="delete-checkin-form" action="/checkin/delete/9"></form></div></div></div>"#;
        let fragment = Fragment::parse(html);
        let form = form_for(&fragment, "/checkin/delete/9");
        assert!(fragment.closest(form, |el| el.name() == "tr").is_none());

        let card = fragment.closest(form, |el| el.has_class("card")).unwrap();
        let list = fragment.element(card).unwrap().parent().unwrap();
        assert!(fragment.element(list).unwrap().has_class("d-md-none"));
    }

    #[test]
    fn test_set_inner_html() {
        let mut fragment = Fragment::parse(TABLE);
        let wrapper = fragment.find(|el| el.has_class("table-responsive")).unwrap();
        fragment.set_inner_html(wrapper, "<p>empty</p>");
        assert_eq!(
            fragment.html(),
            r#"<div class="table-responsive"><p>empty</p></div>"#
        );
    }

    #[test]
    fn test_add_classes_is_idempotent() {
        let mut fragment =
            Fragment::parse(r#"<img src="a.jpg" class="rounded"><img src='b.jpg'>"#);
        assert_eq!(fragment.add_classes("img", &["img-thumbnail"]), 2);
        assert_eq!(fragment.add_classes("img", &["img-thumbnail"]), 0);

        let first = fragment.element(0).unwrap();
        assert!(first.has_class("rounded"));
        assert!(first.has_class("img-thumbnail"));
        assert_eq!(fragment.element(1).unwrap().attr("src"), Some("b.jpg"));
    }

    #[test]
    fn test_form_fields_and_inputs() {
        let fragment = Fragment::parse(TABLE);
        let form = form_for(&fragment, "/checkin/delete/1");
        assert_eq!(
            fragment.form_fields(form),
            vec![("csrf_token".to_string(), "tok".to_string())]
        );
        assert_eq!(fragment.input_value("csrf_token").as_deref(), Some("tok"));
        assert_eq!(fragment.input_value("missing"), None);
    }

    #[test]
    fn test_form_fields_skip_buttons_and_unchecked_boxes() {
        let html = r#"<form action="/save"><input name="note" value="hi"><input type="SUBMIT" name="go" value="Go"><input type="button" name="b" value="x"><input type="checkbox" name="public" value="1"><input type="checkbox" name="pin" value="1" checked><input type="radio" name="mood" value="ok" checked><input type="radio" name="mood" value="meh"><input type="file" name="images[]"><textarea name="extra">more</textarea></form>"#;
        let fragment = Fragment::parse(html);
        let form = form_for(&fragment, "/save");
        let pairs = |v: &[(&str, &str)]| -> Vec<(String, String)> {
            v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        assert_eq!(
            fragment.form_fields(form),
            pairs(&[
                ("note", "hi"),
                ("pin", "1"),
                ("mood", "ok"),
                ("extra", "more"),
            ])
        );
    }

    #[test]
    fn test_edit_keeps_self_closed_element_empty() {
        let mut fragment = Fragment::parse(r#"<section><div class="spacer"/><p>x</p></section>"#);
        let div = fragment.find(|el| el.name() == "div").unwrap();
        fragment.set_attr(div, "style", "opacity: 0");
        assert_eq!(
            fragment.html(),
            r#"<section><div class="spacer" style="opacity: 0"/><p>x</p></section>"#
        );

        assert_eq!(fragment.add_classes("div", &["d-none"]), 1);
        assert!(fragment.html().contains(r#"class="spacer d-none" style="opacity: 0"/>"#));

        let section = fragment.find(|el| el.name() == "section").unwrap();
        let p = fragment.find(|el| el.name() == "p").unwrap();
        assert_eq!(fragment.element(p).unwrap().parent(), Some(section));
        assert_eq!(fragment.child_element_count(section), 2);
    }

    #[test]
    fn test_unclosed_tags_are_tolerated() {
        let fragment = Fragment::parse("<ul><li>one<li>two</ul><p>after");
        let ul = fragment.find(|el| el.name() == "ul").unwrap();
        assert_eq!(fragment.child_element_count(ul), 1);
        let p = fragment.find(|el| el.name() == "p").unwrap();
        assert_eq!(fragment.inner_html(p), "after");
    }

    #[test]
    fn test_set_attr() {
        let mut fragment = Fragment::parse(r#"<tr id="r1"><td>x</td></tr>"#);
        fragment.set_attr(0, "style", "opacity: 0");
        assert_eq!(
            fragment.html(),
            r#"<tr id="r1" style="opacity: 0"><td>x</td></tr>"#
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"fish" & 'chips'</b>"#),
            "&lt;b&gt;&quot;fish&quot; &amp; &#39;chips&#39;&lt;/b&gt;"
        );
    }
}
