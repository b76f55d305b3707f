//! The binding tree.
//!
//! A [`BindingNode`] pairs a selection with the destination it fills. The
//! tree is built in two passes: [`BindingNode::construct`] walks the
//! destination's record fields and narrows the selection for each of them,
//! then [`BindingNode::parse`] extracts text from every bound selection and
//! coerces it into place. With `concurrent` set, siblings in both passes run
//! as rayon tasks; each task reports into its own slot and the first failure
//! in declaration order wins, so results never depend on scheduling.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::coerce::{Bind, Field};
use crate::document::Selection;
use crate::error::{ScanError, ScanResult};
use crate::extractor::Extractor;
use crate::policy::resolve_policy;

enum Destination<'a> {
    /// The node still holds its whole destination.
    Whole(&'a mut dyn Bind),
    /// The destination was a record and now lives in the children's slots.
    Split(&'static str),
}

/// A node of the binding tree.
pub struct BindingNode<'a, 'doc> {
    selection: Selection<'doc>,
    name: Cow<'static, str>,
    destination: Destination<'a>,
    extractor: Option<Extractor>,
    children: Vec<BindingNode<'a, 'doc>>,
    constructed: bool,
    concurrent: bool,
}

impl<'a, 'doc> BindingNode<'a, 'doc> {
    pub fn new(
        selection: Selection<'doc>,
        name: impl Into<Cow<'static, str>>,
        destination: &'a mut dyn Bind,
        extractor: Option<Extractor>,
        concurrent: bool,
    ) -> Self {
        Self {
            selection,
            name: name.into(),
            destination: Destination::Whole(destination),
            extractor,
            children: Vec::new(),
            constructed: false,
            concurrent,
        }
    }

    /// A root node over `destination`, named after its type. Roots never
    /// assign their own value.
    pub fn root(
        selection: Selection<'doc>,
        destination: &'a mut dyn Bind,
        concurrent: bool,
    ) -> Self {
        let name = short_type_name(destination.type_name());
        Self::new(selection, name, destination, None, concurrent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extractor(&self) -> Option<&Extractor> {
        self.extractor.as_ref()
    }

    pub fn children(&self) -> &[BindingNode<'a, 'doc>] {
        &self.children
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    /// Build the subtree for this node's destination. Runs once.
    ///
    /// Scalars become leaves. Records get one child per field with a
    /// non-empty selector, each constructed recursively. Any failure drops
    /// the children built so far and is reported against the failing field.
    /// A record hands its field borrows to the children on the first
    /// attempt, so a failed attempt cannot be repeated either.
    pub fn construct(&mut self) -> ScanResult<()> {
        if self.constructed {
            return Err(ScanError::AlreadyConstructed);
        }

        let (is_record, type_name) = match &self.destination {
            Destination::Whole(destination) => (destination.is_record(), destination.type_name()),
            Destination::Split(_) => return Err(ScanError::DestinationConsumed),
        };

        if !is_record {
            self.constructed = true;
            return Ok(());
        }

        let Destination::Whole(destination) =
            std::mem::replace(&mut self.destination, Destination::Split(type_name))
        else {
            return Err(ScanError::DestinationConsumed);
        };

        let fields = destination.fields();
        let selection = &self.selection;
        let concurrent = self.concurrent;

        let outcome = if concurrent {
            let slots: Vec<ScanResult<Option<BindingNode<'a, 'doc>>>> = fields
                .into_par_iter()
                .map(|field| register(selection, field, concurrent))
                .collect();
            gather(slots)
        } else {
            gather(
                fields
                    .into_iter()
                    .map(|field| register(selection, field, concurrent)),
            )
        };

        match outcome {
            Ok(children) => {
                self.children = children;
                self.constructed = true;
                tracing::debug!(
                    "Constructed '{}' with {} bound fields",
                    self.name,
                    self.children.len()
                );
                Ok(())
            }
            Err(err) => {
                self.children.clear();
                tracing::warn!("Construction of '{}' failed: {err}", self.name);
                Err(err)
            }
        }
    }

    /// Extract and coerce this node's value, then parse every child.
    /// Requires a successful [`BindingNode::construct`].
    pub fn parse(&mut self) -> ScanResult<()> {
        if !self.constructed {
            return Err(ScanError::parse(&self.name, ScanError::NotConstructed));
        }

        if let Err(err) = self.parse_self() {
            tracing::warn!("Parsing '{}' failed: {err}", self.name);
            return Err(ScanError::parse(&self.name, err));
        }

        let outcome = if self.concurrent {
            let slots: Vec<ScanResult<()>> =
                self.children.par_iter_mut().map(BindingNode::parse).collect();
            slots.into_iter().collect::<ScanResult<()>>()
        } else {
            self.children.iter_mut().try_for_each(BindingNode::parse)
        };

        outcome.map_err(|err| ScanError::parse(&self.name, err))?;
        tracing::debug!("Parsed '{}'", self.name);
        Ok(())
    }

    fn parse_self(&mut self) -> ScanResult<()> {
        let Some(extractor) = &self.extractor else {
            return Ok(());
        };

        let raw = extractor.extract(&self.selection)?;
        tracing::trace!("Coercing {:?} into '{}'", raw, self.name);

        match &mut self.destination {
            Destination::Whole(destination) => destination.coerce(&raw),
            Destination::Split(type_name) => Err(ScanError::UnsupportedType(*type_name)),
        }
    }
}

impl std::fmt::Debug for BindingNode<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingNode")
            .field("name", &self.name)
            .field("selection", &self.selection)
            .field("extractor", &self.extractor)
            .field("children", &self.children)
            .field("constructed", &self.constructed)
            .field("concurrent", &self.concurrent)
            .finish()
    }
}

/// Build and construct the child node for one record field. `Ok(None)`
/// means the field carries no selector and is not bound.
fn register<'a, 'doc>(
    selection: &Selection<'doc>,
    field: Field<'a>,
    concurrent: bool,
) -> ScanResult<Option<BindingNode<'a, 'doc>>> {
    if field.selector.is_empty() {
        return Ok(None);
    }

    let name = field.name;
    tracing::trace!("Registering field '{name}' with selector {:?}", field.selector);

    bind_field(selection, field, concurrent)
        .map(Some)
        .map_err(|err| ScanError::construct(name, err))
}

fn bind_field<'a, 'doc>(
    selection: &Selection<'doc>,
    field: Field<'a>,
    concurrent: bool,
) -> ScanResult<BindingNode<'a, 'doc>> {
    let narrowed = selection.find(field.selector)?;
    let extractor = resolve_policy(field.policy)?;
    let mut node = BindingNode::new(narrowed, field.name, field.slot, extractor, concurrent);
    node.construct()?;
    Ok(node)
}

/// Collect registered children in order, stopping at the first failure.
fn gather<'a, 'doc, I>(slots: I) -> ScanResult<Vec<BindingNode<'a, 'doc>>>
where
    I: IntoIterator<Item = ScanResult<Option<BindingNode<'a, 'doc>>>>,
{
    let mut children = Vec::new();
    for slot in slots {
        if let Some(child) = slot? {
            children.push(child);
        }
    }
    Ok(children)
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    const PAGE: &str = r#"
        <html><body>
            <h1 class="title">Catalogue</h1>
            <span class="count">42</span>
            <a class="home" href="/index.html">Home</a>
        </body></html>
    "#;

    #[derive(Default)]
    struct Plain {
        title: String,
        count: i32,
    }

    // Hand-written record that binds nothing.
    impl Bind for Plain {
        fn is_record(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Listing {
        title: String,
        count: i32,
        home: String,
        unbound: String,
    }

    impl Bind for Listing {
        fn is_record(&self) -> bool {
            true
        }

        fn fields(&mut self) -> Vec<Field<'_>> {
            let Self {
                title,
                count,
                home,
                unbound,
            } = self;
            vec![
                Field::new("title", "h1.title", "", title),
                Field::new("count", "span.count", "text", count),
                Field::new("home", "a.home", "attr(href)", home),
                Field::new("unbound", "", "", unbound),
            ]
        }
    }

    #[derive(Default)]
    struct BadPolicy {
        title: String,
    }

    impl Bind for BadPolicy {
        fn is_record(&self) -> bool {
            true
        }

        fn fields(&mut self) -> Vec<Field<'_>> {
            vec![Field::new("title", "h1", "json", &mut self.title)]
        }
    }

    #[test]
    fn test_record_without_selectors_has_no_children() {
        let doc = Document::parse(PAGE);
        let mut plain = Plain::default();
        let mut node = BindingNode::root(doc.root(), &mut plain, false);
        node.construct().unwrap();
        assert!(node.is_constructed());
        assert!(node.children().is_empty());
        node.parse().unwrap();
        drop(node);
        assert_eq!(plain.title, "");
        assert_eq!(plain.count, 0);
    }

    #[test]
    fn test_scalar_is_leaf() {
        let doc = Document::parse(PAGE);
        let mut count = 0i32;
        let selection = doc.root().find("span.count").unwrap();
        let extractor = Some(Extractor::Text);
        let mut node = BindingNode::new(selection, "count", &mut count, extractor, false);
        node.construct().unwrap();
        assert!(node.children().is_empty());
        node.parse().unwrap();
        drop(node);
        assert_eq!(count, 42);
    }

    #[test]
    fn test_construct_skips_fields_without_selector() {
        let doc = Document::parse(PAGE);
        let mut listing = Listing::default();
        let mut node = BindingNode::root(doc.root(), &mut listing, false);
        node.construct().unwrap();
        let names: Vec<&str> = node.children().iter().map(BindingNode::name).collect();
        assert_eq!(names, vec!["title", "count", "home"]);
        assert_eq!(
            node.children()[2].extractor(),
            Some(&Extractor::Attr("href".into()))
        );
    }

    #[test]
    fn test_construct_twice_fails_and_keeps_tree() {
        let doc = Document::parse(PAGE);
        let mut listing = Listing::default();
        let mut node = BindingNode::root(doc.root(), &mut listing, false);
        node.construct().unwrap();
        let err = node.construct().unwrap_err();
        assert!(matches!(err, ScanError::AlreadyConstructed));
        assert_eq!(node.children().len(), 3);
        assert!(node.is_constructed());
    }

    #[test]
    fn test_parse_before_construct_fails() {
        let doc = Document::parse(PAGE);
        let mut listing = Listing::default();
        let mut node = BindingNode::root(doc.root(), &mut listing, false);
        let err = node.parse().unwrap_err();
        assert!(matches!(err.root_cause(), ScanError::NotConstructed));
        assert_eq!(err.field_path(), vec!["Listing"]);
    }

    #[test]
    fn test_construct_failure_discards_children() {
        let doc = Document::parse(PAGE);
        let mut bad = BadPolicy::default();
        let mut node = BindingNode::root(doc.root(), &mut bad, false);
        let err = node.construct().unwrap_err();
        assert!(matches!(err, ScanError::Construct { ref field, .. } if field == "title"));
        assert!(matches!(err.root_cause(), ScanError::InvalidPolicy(p) if p == "json"));
        assert!(node.children().is_empty());
        assert!(!node.is_constructed());
        assert!(matches!(node.construct(), Err(ScanError::DestinationConsumed)));
        assert!(!node.is_constructed());
    }

    #[derive(Default)]
    struct TwoBroken {
        title: String,
        count: i32,
        home: String,
    }

    impl Bind for TwoBroken {
        fn is_record(&self) -> bool {
            true
        }

        fn fields(&mut self) -> Vec<Field<'_>> {
            let Self { title, count, home } = self;
            vec![
                Field::new("title", "h1.title", "", title),
                Field::new("count", "span.count", "bogus", count),
                Field::new("home", "a[", "attr(href)", home),
            ]
        }
    }

    #[test]
    fn test_concurrent_construct_reports_first_failing_field() {
        let doc = Document::parse(PAGE);
        for _ in 0..100 {
            let mut broken = TwoBroken::default();
            let mut node = BindingNode::root(doc.root(), &mut broken, true);
            let err = node.construct().unwrap_err();
            assert_eq!(err.field_path(), vec!["count"]);
            assert!(matches!(err.root_cause(), ScanError::InvalidPolicy(p) if p == "bogus"));
            assert!(node.children().is_empty());
            assert!(!node.is_constructed());
        }
    }

    #[test]
    fn test_parse_fills_fields() {
        for concurrent in [false, true] {
            let doc = Document::parse(PAGE);
            let mut listing = Listing::default();
            let mut node = BindingNode::root(doc.root(), &mut listing, concurrent);
            node.construct().unwrap();
            node.parse().unwrap();
            drop(node);
            assert_eq!(listing.title, "Catalogue");
            assert_eq!(listing.count, 42);
            assert_eq!(listing.home, "/index.html");
            assert_eq!(listing.unbound, "");
        }
    }

    #[test]
    fn test_record_with_extractor_is_unsupported() {
        let doc = Document::parse(PAGE);
        let mut listing = Listing::default();
        let extractor = Some(Extractor::Text);
        let mut node = BindingNode::new(doc.root(), "listing", &mut listing, extractor, false);
        node.construct().unwrap();
        let err = node.parse().unwrap_err();
        assert_eq!(err.field_path(), vec!["listing"]);
        assert!(matches!(
            err.root_cause(),
            ScanError::UnsupportedType(name) if name.ends_with("Listing")
        ));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("my_crate::pages::Listing"), "Listing");
        assert_eq!(short_type_name("core::option::Option<my_crate::Listing>"), "Option");
        assert_eq!(short_type_name("i32"), "i32");
    }
}
