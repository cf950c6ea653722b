//! Minimal page model the widgets are written against
//!
//! Widgets never touch a concrete DOM. They query a [`Page`] for elements by
//! selector and mutate them through the [`Element`] trait. [`MemoryPage`] is
//! the in-process implementation used by the CLI and by tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// A single element on the page
pub trait Element: Send + Sync {
    /// Rendered child markup
    fn inner_html(&self) -> String;

    /// Replace all child markup
    fn set_inner_html(&self, html: &str);

    /// Form value (text fields, inputs)
    fn value(&self) -> String;

    /// Set the form value without emitting an input event
    fn set_value(&self, value: &str);

    fn add_class(&self, class: &str);

    fn remove_class(&self, class: &str);

    fn has_class(&self, class: &str) -> bool;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Set or remove (`None`) an attribute
    fn set_attribute(&self, name: &str, value: Option<&str>);

    fn set_visible(&self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Subscribe to user input events on this element
    fn subscribe_input(&self) -> broadcast::Receiver<()>;
}

/// Access to the elements and ambient state of one page
pub trait Page: Send + Sync {
    /// Find the element registered under `selector`
    fn query(&self, selector: &str) -> Option<Arc<dyn Element>>;

    /// Read a cookie value
    fn cookie(&self, name: &str) -> Option<String>;

    /// Read the `content` of a `<meta name=...>` tag
    fn meta(&self, name: &str) -> Option<String>;

    /// Put `text` on the clipboard. Pages without one return false.
    fn write_clipboard(&self, _text: &str) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct ElementState {
    inner_html: String,
    value: String,
    classes: BTreeSet<String>,
    attributes: HashMap<String, String>,
    hidden: bool,
}

/// In-memory element
#[derive(Debug)]
pub struct MemoryElement {
    state: Mutex<ElementState>,
    input_tx: broadcast::Sender<()>,
}

impl MemoryElement {
    /// Create an empty element
    pub fn new() -> Self {
        let (input_tx, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(ElementState::default()),
            input_tx,
        }
    }

    /// Create a form field with an initial value
    pub fn with_value(value: &str) -> Self {
        let element = Self::new();
        element.set_value(value);
        element
    }

    /// Create a container with initial markup
    pub fn with_html(html: &str) -> Self {
        let element = Self::new();
        element.set_inner_html(html);
        element
    }

    /// Simulate the user editing the field: update the value and fire an
    /// input event.
    pub fn type_text(&self, value: &str) {
        self.set_value(value);
        // No subscribers is fine: nobody is listening yet.
        let _ = self.input_tx.send(());
    }

    fn state(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryElement {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for MemoryElement {
    fn inner_html(&self) -> String {
        self.state().inner_html.clone()
    }

    fn set_inner_html(&self, html: &str) {
        self.state().inner_html = html.to_string();
    }

    fn value(&self) -> String {
        self.state().value.clone()
    }

    fn set_value(&self, value: &str) {
        self.state().value = value.to_string();
    }

    fn add_class(&self, class: &str) {
        self.state().classes.insert(class.to_string());
    }

    fn remove_class(&self, class: &str) {
        self.state().classes.remove(class);
    }

    fn has_class(&self, class: &str) -> bool {
        self.state().classes.contains(class)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.state().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: Option<&str>) {
        let mut state = self.state();
        match value {
            Some(value) => {
                state.attributes.insert(name.to_string(), value.to_string());
            }
            None => {
                state.attributes.remove(name);
            }
        }
    }

    fn set_visible(&self, visible: bool) {
        self.state().hidden = !visible;
    }

    fn is_visible(&self) -> bool {
        !self.state().hidden
    }

    fn subscribe_input(&self) -> broadcast::Receiver<()> {
        self.input_tx.subscribe()
    }
}

/// In-memory page: elements are registered under the selector used to find them
#[derive(Default)]
pub struct MemoryPage {
    elements: Mutex<HashMap<String, Arc<dyn Element>>>,
    cookies: Mutex<HashMap<String, String>>,
    meta: Mutex<HashMap<String, String>>,
    clipboard: Mutex<Option<String>>,
}

impl MemoryPage {
    /// Create an empty page
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element under a selector
    pub fn insert(&self, selector: &str, element: Arc<dyn Element>) {
        lock(&self.elements).insert(selector.to_string(), element);
    }

    /// Remove the element registered under a selector
    pub fn remove(&self, selector: &str) -> Option<Arc<dyn Element>> {
        lock(&self.elements).remove(selector)
    }

    /// Set a single cookie
    pub fn set_cookie(&self, name: &str, value: &str) {
        lock(&self.cookies).insert(name.to_string(), value.to_string());
    }

    /// Load cookies from a `name=value; name2=value2` string
    pub fn set_cookie_string(&self, cookies: &str) {
        let mut jar = lock(&self.cookies);
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                jar.insert(name.trim().to_string(), value.to_string());
            }
        }
    }

    /// Set a `<meta name=... content=...>` tag
    pub fn set_meta(&self, name: &str, content: &str) {
        lock(&self.meta).insert(name.to_string(), content.to_string());
    }

    /// Give the page a clipboard, initially empty
    pub fn enable_clipboard(&self) {
        lock(&self.clipboard).get_or_insert_with(String::new);
    }

    /// Clipboard contents, if the page has a clipboard
    pub fn clipboard(&self) -> Option<String> {
        lock(&self.clipboard).clone()
    }
}

impl Page for MemoryPage {
    fn query(&self, selector: &str) -> Option<Arc<dyn Element>> {
        lock(&self.elements).get(selector).cloned()
    }

    fn cookie(&self, name: &str) -> Option<String> {
        lock(&self.cookies).get(name).cloned()
    }

    fn meta(&self, name: &str) -> Option<String> {
        lock(&self.meta).get(name).cloned()
    }

    fn write_clipboard(&self, text: &str) -> bool {
        match lock(&self.clipboard).as_mut() {
            Some(clipboard) => {
                *clipboard = text.to_string();
                true
            }
            None => false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
