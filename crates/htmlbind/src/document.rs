//! Parsed documents and the selection handles the decoder queries.
//!
//! `scraper` does the parsing and the CSS matching. Its `Html` tree is not
//! `Sync`, so a [`Document`] keeps it behind a mutex and a [`Selection`] is
//! just a list of node ids into it. That makes selections `Send + Sync`,
//! which the concurrent scan mode relies on. Every query locks the tree for
//! the duration of one lookup.

use std::collections::HashSet;
use std::io::Read;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::config::Config;
use crate::error::{ScanError, ScanResult};

/// An owned, parsed HTML document.
pub struct Document {
    html: Mutex<Html>,
    root: NodeId,
    config: Config,
}

impl Document {
    /// Parse a full HTML document with the default config.
    pub fn parse(source: &str) -> Self {
        Self::parse_with(source, Config::default())
    }

    /// Parse a full HTML document with the given config.
    pub fn parse_with(source: &str, config: Config) -> Self {
        let html = Html::parse_document(source);
        let root = html.tree.root().id();
        tracing::debug!(
            "Parsed document ({} bytes, {} parse errors)",
            source.len(),
            html.errors.len()
        );

        Self {
            html: Mutex::new(html),
            root,
            config,
        }
    }

    /// Parse a document from raw bytes. Invalid UTF-8 is replaced, not rejected.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Read and parse a document from any reader.
    ///
    /// The reader is consumed to the end but never closed; that stays the
    /// caller's responsibility.
    pub fn from_reader<R: Read>(mut reader: R) -> ScanResult<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Replace the config selections inherit from this document.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// A selection holding only the document node.
    pub fn root(&self) -> Selection<'_> {
        Selection {
            document: self,
            nodes: vec![self.root],
            config: self.config,
        }
    }

    /// Scan the whole document into `destination`.
    pub fn scan<T: crate::Bind>(&self, destination: &mut T) -> ScanResult<()> {
        self.root().scan(destination)
    }

    fn lock(&self) -> MutexGuard<'_, Html> {
        // Queries never leave the tree half-modified, so a poisoned lock is still readable.
        self.html.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A set of matched nodes in a [`Document`].
#[derive(Clone)]
pub struct Selection<'doc> {
    document: &'doc Document,
    nodes: Vec<NodeId>,
    config: Config,
}

impl<'doc> Selection<'doc> {
    fn with_nodes(&self, nodes: Vec<NodeId>) -> Self {
        Self {
            document: self.document,
            nodes,
            config: self.config,
        }
    }

    /// Descendants of every node in the selection matching `selector`,
    /// without duplicates, in match order.
    pub fn find(&self, selector: &str) -> ScanResult<Selection<'doc>> {
        let parsed = Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;

        let html = self.document.lock();
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for node in self.nodes.iter().filter_map(|id| html.tree.get(*id)) {
            let ids: Vec<NodeId> = match ElementRef::wrap(node) {
                Some(element) => element.select(&parsed).map(|el| el.id()).collect(),
                None if node.value().is_document() => {
                    html.select(&parsed).map(|el| el.id()).collect()
                }
                None => continue,
            };
            matched.extend(ids.into_iter().filter(|id| seen.insert(*id)));
        }

        Ok(self.with_nodes(matched))
    }

    /// The first matched node, or an empty selection.
    pub fn first(&self) -> Selection<'doc> {
        self.eq(0)
    }

    /// The node at `index`; negative indices count back from the end.
    /// Out-of-range indices give an empty selection.
    pub fn eq(&self, index: isize) -> Selection<'doc> {
        let len = self.nodes.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        let nodes = if (0..len).contains(&resolved) {
            vec![self.nodes[resolved as usize]]
        } else {
            Vec::new()
        };
        self.with_nodes(nodes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One single-node selection per matched node.
    pub fn iter(&self) -> impl Iterator<Item = Selection<'doc>> + '_ {
        self.nodes.iter().map(|id| self.with_nodes(vec![*id]))
    }

    /// Text of the matched nodes' direct text children only. Text inside
    /// nested elements is left out; whitespace is kept as-is.
    pub fn own_text(&self) -> String {
        let html = self.document.lock();
        let mut text = String::new();
        for node in self.nodes.iter().filter_map(|id| html.tree.get(*id)) {
            for child in node.children() {
                if let Some(t) = child.value().as_text() {
                    text.push_str(t);
                }
            }
        }
        text
    }

    /// All descendant text of the matched nodes.
    pub fn text(&self) -> String {
        let html = self.document.lock();
        let mut text = String::new();
        for node in self.nodes.iter().filter_map(|id| html.tree.get(*id)) {
            for descendant in node.descendants() {
                if let Some(t) = descendant.value().as_text() {
                    text.push_str(t);
                }
            }
        }
        text
    }

    /// Inner markup of the first matched node; empty for an empty selection.
    pub fn inner_html(&self) -> String {
        let html = self.document.lock();
        let Some(node) = self.nodes.first().and_then(|id| html.tree.get(*id)) else {
            return String::new();
        };

        match ElementRef::wrap(node) {
            Some(element) => element.inner_html(),
            None if node.value().is_document() => html.html(),
            None => String::new(),
        }
    }

    /// The named attribute of the first matched element.
    pub fn attr(&self, name: &str) -> Option<String> {
        let html = self.document.lock();
        let node = self.nodes.first().and_then(|id| html.tree.get(*id))?;
        ElementRef::wrap(node)?.value().attr(name).map(str::to_string)
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Scan this selection into `destination` using the selection's config.
    pub fn scan<T: crate::Bind>(&self, destination: &mut T) -> ScanResult<()> {
        crate::decode(self, destination, self.config)
    }

    /// Scan with an explicit config overriding the inherited one.
    pub fn scan_with<T: crate::Bind>(&self, destination: &mut T, config: Config) -> ScanResult<()> {
        crate::decode(self, destination, config)
    }
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("len", &self.nodes.len())
            .field("config", &self.config)
            .finish()
    }
}
