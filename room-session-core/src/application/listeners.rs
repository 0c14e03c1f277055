use std::collections::HashMap;
use std::fmt;

use crate::domain::{normalize, InboundLine, LineKind};

/// Normalized key a listener waits for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    kind: LineKind,
    /// Block name, only for named updates
    name: Option<String>,
    content: String,
}

impl ListenerKey {
    pub fn text(content: &str) -> Self {
        Self {
            kind: LineKind::Text,
            name: None,
            content: normalize(content),
        }
    }

    pub fn html(content: &str) -> Self {
        Self {
            kind: LineKind::Html,
            name: None,
            content: normalize(content),
        }
    }

    pub fn named_update(name: &str, content: &str) -> Self {
        Self {
            kind: LineKind::NamedUpdate,
            name: Some(normalize(name)),
            content: normalize(content),
        }
    }

    /// Key an inbound line would match
    pub fn for_line(line: &InboundLine) -> Self {
        match line {
            InboundLine::Text { content } => Self::text(content),
            InboundLine::Html { content } => Self::html(content),
            InboundLine::NamedUpdate { name, content } => Self::named_update(name, content),
        }
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]:{}", self.kind, name, self.content),
            None => write!(f, "{}:{}", self.kind, self.content),
        }
    }
}

/// Pending one-shot callbacks of one channel.
///
/// Three independent namespaces (text, html, named updates). Named updates
/// are keyed by block name first, then by content. At most one entry exists
/// per key; a match always removes it.
#[derive(Debug)]
pub struct ListenerRegistry<C> {
    text: HashMap<String, C>,
    html: HashMap<String, C>,
    named: HashMap<String, HashMap<String, C>>,
}

impl<C> Default for ListenerRegistry<C> {
    fn default() -> Self {
        Self {
            text: HashMap::new(),
            html: HashMap::new(),
            named: HashMap::new(),
        }
    }
}

impl<C> ListenerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a callback, returning the one it replaced
    pub fn register(&mut self, key: ListenerKey, callback: C) -> Option<C> {
        let replaced = match key.name {
            Some(name) => self
                .named
                .entry(name)
                .or_default()
                .insert(key.content, callback),
            None => match key.kind {
                LineKind::Html => self.html.insert(key.content, callback),
                _ => self.text.insert(key.content, callback),
            },
        };

        if replaced.is_some() {
            tracing::debug!("Listener replaced");
        }
        replaced
    }

    /// Remove and return the callback waiting for this line, if any
    pub fn take_match(&mut self, line: &InboundLine) -> Option<C> {
        self.remove(&ListenerKey::for_line(line))
    }

    pub fn remove(&mut self, key: &ListenerKey) -> Option<C> {
        match &key.name {
            Some(name) => {
                let block = self.named.get_mut(name)?;
                let callback = block.remove(&key.content);
                if block.is_empty() {
                    self.named.remove(name);
                }
                callback
            }
            None => match key.kind {
                LineKind::Html => self.html.remove(&key.content),
                _ => self.text.remove(&key.content),
            },
        }
    }

    pub fn contains(&self, key: &ListenerKey) -> bool {
        match &key.name {
            Some(name) => self
                .named
                .get(name)
                .is_some_and(|block| block.contains_key(&key.content)),
            None => match key.kind {
                LineKind::Html => self.html.contains_key(&key.content),
                _ => self.text.contains_key(&key.content),
            },
        }
    }

    /// Drop every callback for which `keep` returns false.
    /// Returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&C) -> bool,
    {
        let before = self.len();

        self.text.retain(|_, c| keep(c));
        self.html.retain(|_, c| keep(c));
        for block in self.named.values_mut() {
            block.retain(|_, c| keep(c));
        }
        self.named.retain(|_, block| !block.is_empty());

        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.html.len() + self.named.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
