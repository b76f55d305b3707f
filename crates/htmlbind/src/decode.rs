//! Decode entry point.

use crate::coerce::Bind;
use crate::config::Config;
use crate::document::Selection;
use crate::error::ScanResult;
use crate::node::BindingNode;

/// Decode `selection` into `destination`.
///
/// Builds a binding tree rooted at `destination`, then runs construction and
/// parsing over it. Fields already written before a failure keep their new
/// values; nothing is rolled back.
pub fn decode(
    selection: &Selection<'_>,
    destination: &mut dyn Bind,
    config: Config,
) -> ScanResult<()> {
    let mut root = BindingNode::root(selection.clone(), destination, config.concurrent);
    tracing::debug!(
        "Decoding {} nodes into '{}' (concurrent: {})",
        selection.len(),
        root.name(),
        config.concurrent
    );

    root.construct()?;
    root.parse()?;

    tracing::debug!("Decoded '{}'", root.name());
    Ok(())
}
