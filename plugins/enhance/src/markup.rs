//! A forgiving HTML fragment model: tags are located with regular
//! expressions and nested by an open-element stack. Only start tags whose
//! style was changed are re-serialized; everything else is emitted verbatim.

use regex::Regex;
use std::sync::OnceLock;

use crate::style::StyleMap;

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static STYLE_ATTR_RE: OnceLock<Regex> = OnceLock::new();
static CLASS_ATTR_RE: OnceLock<Regex> = OnceLock::new();

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--.*?-->|<![^>]*>|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
        )
        .unwrap()
    })
}

fn style_attr_re() -> &'static Regex {
    STYLE_ATTR_RE
        .get_or_init(|| Regex::new(r#"(?is)\sstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn class_attr_re() -> &'static Regex {
    CLASS_ATTR_RE.get_or_init(|| {
        Regex::new(r#"(?is)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
    })
}

fn first_group(captures: &regex::Captures<'_>) -> String {
    (1..captures.len())
        .find_map(|i| captures.get(i))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[derive(Debug)]
enum Token {
    Text(String),
    Open(usize),
}

/// One start tag and its place in the tree
#[derive(Debug)]
pub struct Node {
    pub tag: String,
    pub parent: Option<usize>,
    pub class: String,
    raw: String,
    name: String,
    attributes: String,
    self_closing: bool,
    original_style: Option<String>,
    style: StyleMap,
    touched: bool,
}

impl Node {
    pub fn has_class(&self, class: &str) -> bool {
        self.class.split_whitespace().any(|c| c == class)
    }

    /// The current value of the style attribute
    pub fn style_text(&self) -> String {
        if self.touched {
            self.style.to_string()
        } else {
            self.original_style.clone().unwrap_or_default()
        }
    }

    pub fn style(&self) -> &StyleMap {
        &self.style
    }

    pub fn apply(&mut self, declarations: &[(&str, &str)]) {
        self.style.merge(declarations);
        self.touched = true;
    }

    fn render(&self, out: &mut String) {
        if !self.touched {
            out.push_str(&self.raw);
            return;
        }
        let attributes = style_attr_re().replace_all(&self.attributes, "");
        out.push('<');
        out.push_str(&self.name);
        out.push_str(attributes.trim_end());
        out.push_str(" style=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(
            &self.style.to_string(),
        ));
        out.push('"');
        if self.self_closing {
            out.push_str(" /");
        }
        out.push('>');
    }
}

/// Parsed fragment. Node indices follow document order.
#[derive(Debug)]
pub struct Fragment {
    tokens: Vec<Token>,
    nodes: Vec<Node>,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let mut tokens = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        let mut last = 0;

        for captures in tag_re().captures_iter(html) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.start() > last {
                tokens.push(Token::Text(html[last..whole.start()].to_string()));
            }
            last = whole.end();

            let Some(name) = captures.get(2) else {
                // Comment or doctype
                tokens.push(Token::Text(whole.as_str().to_string()));
                continue;
            };
            let tag = name.as_str().to_ascii_lowercase();

            if captures.get(1).is_some_and(|m| m.as_str() == "/") {
                if let Some(position) = open.iter().rposition(|&i| nodes[i].tag == tag) {
                    open.truncate(position);
                }
                tokens.push(Token::Text(whole.as_str().to_string()));
                continue;
            }

            let mut attributes = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
            let self_closing = attributes.trim_end().ends_with('/');
            if self_closing {
                attributes = attributes.trim_end().trim_end_matches('/');
            }

            let original_style = style_attr_re()
                .captures(attributes)
                .map(|c| html_escape::decode_html_entities(&first_group(&c)).into_owned());
            let class = class_attr_re()
                .captures(attributes)
                .map(|c| html_escape::decode_html_entities(&first_group(&c)).into_owned())
                .unwrap_or_default();

            let index = nodes.len();
            nodes.push(Node {
                parent: open.last().copied(),
                class,
                raw: whole.as_str().to_string(),
                name: name.as_str().to_string(),
                attributes: attributes.to_string(),
                self_closing,
                style: original_style
                    .as_deref()
                    .map(StyleMap::parse)
                    .unwrap_or_default(),
                original_style,
                touched: false,
                tag,
            });
            tokens.push(Token::Open(index));

            if !self_closing && !VOID_ELEMENTS.contains(&nodes[index].tag.as_str()) {
                open.push(index);
            }
        }

        if last < html.len() {
            tokens.push(Token::Text(html[last..].to_string()));
        }

        Self { tokens, nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    /// Every element with the given tag, in document order
    pub fn elements(&self, tag: &str) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].tag == tag)
            .collect()
    }

    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            fragment: self,
            next: self.nodes[index].parent,
        }
    }

    /// Nearest ancestor with the given tag
    pub fn closest(&self, index: usize, tag: &str) -> Option<usize> {
        self.ancestors(index).find(|&i| self.nodes[i].tag == tag)
    }

    /// Elements with the given tag nested anywhere below `root`
    pub fn descendants(&self, root: usize, tag: &str) -> Vec<usize> {
        ((root + 1)..self.nodes.len())
            .filter(|&i| self.nodes[i].tag == tag && self.ancestors(i).any(|a| a == root))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Open(index) => self.nodes[*index].render(&mut out),
            }
        }
        out
    }
}

pub struct Ancestors<'a> {
    fragment: &'a Fragment,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.fragment.nodes[current].parent;
        Some(current)
    }
}
