//! Derive macro for `htmlbind`.

use proc_macro::TokenStream;

mod derive_bind;

/// Derive `htmlbind::Bind` for a struct with named fields.
///
/// Only fields carrying `#[bind(...)]` take part in decoding. `sel` is the
/// CSS selector relative to the parent's selection; `src` is the extraction
/// policy (`text`, `html`, `attr(name)` or `_`) and defaults to `text`.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Bind)]
/// struct Book {
///     #[bind(sel = "h3 > a", src = "attr(title)")]
///     title: String,
///     #[bind(sel = "p.price_color")]
///     price: FloatUnitValue,
/// }
/// ```
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    derive_bind::derive_bind(input)
}
