//! Implementation of `#[derive(Bind)]`.
//!
//! Reads `#[bind(sel = "...", src = "...")]` off named struct fields and
//! emits an `htmlbind::Bind` impl listing them as record fields.

use proc_macro::TokenStream;
use proc_macro2::{Delimiter, TokenStream as TokenStream2, TokenTree as TokenTree2};
use quote::quote;
use unsynn::*;

keyword! {
    KStruct = "struct";
    KEnum = "enum";
    KPub = "pub";
}

unsynn! {
    /// Visibility: `pub` or `pub(...)`
    enum Vis {
        PubIn(Cons<KPub, ParenthesisGroup>),
        Pub(KPub),
    }

    /// An attribute: `#[...]`
    struct Attribute {
        _pound: Pound,
        content: BracketGroup,
    }

    enum DeriveInput {
        Struct(StructDef),
        Enum(EnumDef),
    }

    struct StructDef {
        attrs: Vec<Attribute>,
        vis: Option<Vis>,
        _kw_struct: KStruct,
        name: Ident,
        body: StructBody,
    }

    enum StructBody {
        Named(BraceGroup),
        Tuple(Cons<ParenthesisGroup, Semicolon>),
        Unit(Semicolon),
    }

    struct StructField {
        attrs: Vec<Attribute>,
        vis: Option<Vis>,
        name: Ident,
        _colon: Colon,
        ty: Vec<TokenTree>,
    }

    struct EnumDef {
        attrs: Vec<Attribute>,
        vis: Option<Vis>,
        _kw_enum: KEnum,
        name: Ident,
        body: BraceGroup,
    }
}

/// Selector and policy of one `#[bind(...)]` attribute.
#[derive(Debug, Default, PartialEq)]
struct BindArgs {
    sel: String,
    src: String,
}

/// Split a named-field body on its top-level commas. Commas inside generic
/// arguments belong to the field type; bracketed groups are single tokens
/// already.
fn split_fields(body: TokenStream2) -> Vec<TokenStream2> {
    let mut fields = Vec::new();
    let mut current: Vec<TokenTree2> = Vec::new();
    let mut depth = 0usize;
    let mut after_dash = false;

    for tt in body {
        if let TokenTree2::Punct(p) = &tt {
            match p.as_char() {
                ',' if depth == 0 => {
                    if !current.is_empty() {
                        fields.push(current.drain(..).collect());
                    }
                    after_dash = false;
                    continue;
                }
                '<' => depth += 1,
                // `->` in a fn pointer type is not a closing bracket.
                '>' if !after_dash => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        after_dash = matches!(&tt, TokenTree2::Punct(p) if p.as_char() == '-');
        current.push(tt);
    }

    if !current.is_empty() {
        fields.push(current.into_iter().collect());
    }
    fields
}

fn parse_field(tokens: TokenStream2) -> std::result::Result<StructField, String> {
    let mut iter = tokens.to_token_iter();
    let field: StructField = iter.parse().map_err(|e| e.to_string())?;
    Ok(field)
}

/// The token trees inside `#[...]` when it is a `bind` attribute.
fn bind_attr_tokens(attr: &Attribute) -> Option<Vec<TokenTree2>> {
    let tokens: Vec<TokenTree2> = attr.content.0.stream().into_iter().collect();
    match tokens.first() {
        Some(TokenTree2::Ident(ident)) if ident == "bind" => Some(tokens),
        _ => None,
    }
}

fn parse_bind_args(tokens: &[TokenTree2]) -> std::result::Result<BindArgs, String> {
    let inner = match tokens.get(1) {
        None => return Ok(BindArgs::default()),
        Some(TokenTree2::Group(g)) if g.delimiter() == Delimiter::Parenthesis => g.stream(),
        Some(other) => return Err(format!("expected bind(...), found `{other}`")),
    };
    if tokens.len() > 2 {
        return Err("unexpected tokens after bind(...)".to_string());
    }

    let mut args = BindArgs::default();
    let mut inner = inner.into_iter().peekable();

    while inner.peek().is_some() {
        let key = match inner.next() {
            Some(TokenTree2::Ident(ident)) => ident.to_string(),
            other => return Err(format!("expected `sel` or `src`, found {other:?}")),
        };

        match inner.next() {
            Some(TokenTree2::Punct(p)) if p.as_char() == '=' => {}
            _ => return Err(format!("expected `=` after `{key}`")),
        }

        let value = match inner.next() {
            Some(TokenTree2::Literal(lit)) => unquote(&lit.to_string())
                .ok_or_else(|| format!("`{key}` must be a string literal"))?,
            _ => return Err(format!("`{key}` must be a string literal")),
        };

        match key.as_str() {
            "sel" => args.sel = value,
            "src" => args.src = value,
            _ => return Err(format!("unknown bind argument `{key}`, expected `sel` or `src`")),
        }

        match inner.next() {
            None => break,
            Some(TokenTree2::Punct(p)) if p.as_char() == ',' => {}
            Some(other) => return Err(format!("expected `,`, found `{other}`")),
        }
    }

    Ok(args)
}

/// The value of a string literal as written in source, or `None` if the
/// literal is not a string.
fn unquote(literal: &str) -> Option<String> {
    if let Some(raw) = literal.strip_prefix('r') {
        let hashes = raw.len() - raw.trim_start_matches('#').len();
        let body = &raw[hashes..];
        let body = body.strip_prefix('"')?;
        let body = body.strip_suffix(&"#".repeat(hashes))?;
        return body.strip_suffix('"').map(str::to_string);
    }

    let body = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}

fn process_struct(def: &StructDef) -> std::result::Result<TokenStream2, String> {
    let name = &def.name;

    if def.attrs.iter().any(|attr| bind_attr_tokens(attr).is_some()) {
        return Err("#[bind(...)] belongs on fields, not on the struct".to_string());
    }

    let fields = match &def.body {
        StructBody::Named(body) => split_fields(body.0.stream())
            .into_iter()
            .map(parse_field)
            .collect::<std::result::Result<Vec<_>, _>>()?,
        StructBody::Tuple(_) => return Err("Bind derive requires named fields".to_string()),
        StructBody::Unit(_) => Vec::new(),
    };

    let mut idents = Vec::new();
    let mut entries = Vec::new();

    for field in fields {
        let mut bound = None;
        for attr in &field.attrs {
            if let Some(tokens) = bind_attr_tokens(attr) {
                if bound.is_some() {
                    return Err(format!("duplicate #[bind] on field `{}`", field.name));
                }
                bound = Some(parse_bind_args(&tokens)?);
            }
        }

        let Some(args) = bound else {
            continue;
        };

        let ident = &field.name;
        let label = ident.to_string();
        let label = label.strip_prefix("r#").unwrap_or(&label).to_string();
        let BindArgs { sel, src } = args;

        entries.push(quote! {
            ::htmlbind::Field::new(#label, #sel, #src, #ident)
        });
        idents.push(ident.clone());
    }

    let body = if entries.is_empty() {
        quote! { ::std::vec::Vec::new() }
    } else {
        quote! {
            let Self { #(#idents,)* .. } = self;
            ::std::vec![#(#entries),*]
        }
    };

    Ok(quote! {
        impl ::htmlbind::Bind for #name {
            fn is_record(&self) -> bool {
                true
            }

            fn fields(&mut self) -> ::std::vec::Vec<::htmlbind::Field<'_>> {
                #body
            }
        }
    })
}

pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input2 = TokenStream2::from(input);
    let mut iter = input2.to_token_iter();

    let parsed: DeriveInput = match iter.parse() {
        Ok(i) => i,
        Err(e) => {
            let msg = format!("Bind derive supports non-generic structs with named fields: {e}");
            return quote! { compile_error!(#msg); }.into();
        }
    };

    let expanded = match parsed {
        DeriveInput::Struct(def) => process_struct(&def),
        DeriveInput::Enum(def) => Err(format!("Bind cannot be derived for enum `{}`", def.name)),
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => quote! { compile_error!(#err); }.into(),
    }
}
