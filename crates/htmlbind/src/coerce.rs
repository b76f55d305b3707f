//! Destination-side traits: how a value describes its bindable fields and how
//! raw extracted text is coerced into it.

use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::{ScanError, ScanResult};

/// A value the decoder can write into.
///
/// Scalars implement [`Bind::coerce`]; records (usually via
/// `#[derive(Bind)]`) implement [`Bind::is_record`] and [`Bind::fields`] and
/// keep the default `coerce`, which rejects direct assignment.
pub trait Bind: Send {
    /// Assign the raw text extracted for this value.
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        let _ = raw;
        Err(ScanError::UnsupportedType(self.type_name()))
    }

    /// Whether this value is a record whose fields get their own bindings.
    fn is_record(&self) -> bool {
        false
    }

    /// The bindable fields of a record, in declaration order. Each field
    /// borrows a disjoint part of `self`.
    fn fields(&mut self) -> Vec<Field<'_>> {
        Vec::new()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A custom "decode from text" hook.
///
/// Every `TextDecode` type is [`Bind`]; the hook replaces the built-in
/// coercion and its error is returned as-is.
pub trait TextDecode {
    fn decode_text(&mut self, raw: &str) -> ScanResult<()>;
}

impl<T: TextDecode + Send> Bind for T {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        self.decode_text(raw)
    }
}

/// One annotated field of a record.
pub struct Field<'a> {
    pub name: &'static str,
    /// CSS selector narrowing the parent's selection. Empty skips the field.
    pub selector: &'static str,
    /// Extraction policy, see [`crate::resolve_policy`].
    pub policy: &'static str,
    pub slot: &'a mut dyn Bind,
}

impl<'a> Field<'a> {
    pub fn new(
        name: &'static str,
        selector: &'static str,
        policy: &'static str,
        slot: &'a mut dyn Bind,
    ) -> Self {
        Self {
            name,
            selector,
            policy,
            slot,
        }
    }
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("policy", &self.policy)
            .field("slot", &self.slot.type_name())
            .finish()
    }
}

fn parse_integer<T>(raw: &str) -> ScanResult<T>
where
    T: FromStr<Err = ParseIntError>,
{
    let numeric = |reason: String| ScanError::NumericParse {
        input: raw.to_string(),
        kind: std::any::type_name::<T>(),
        reason,
    };

    // `FromStr` accepts a leading '+', the decoder only takes an optional '-'.
    if raw.starts_with('+') {
        return Err(numeric("unexpected '+' sign".to_string()));
    }
    raw.parse::<T>().map_err(|e| numeric(e.to_string()))
}

pub(crate) fn parse_float(raw: &str) -> ScanResult<f64> {
    raw.parse::<f64>().map_err(|e| ScanError::NumericParse {
        input: raw.to_string(),
        kind: "f64",
        reason: e.to_string(),
    })
}

macro_rules! bind_integers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bind for $ty {
                fn coerce(&mut self, raw: &str) -> ScanResult<()> {
                    *self = parse_integer(raw)?;
                    Ok(())
                }
            }
        )*
    };
}

bind_integers!(i8, i16, i32, i64, isize);

impl Bind for f64 {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        *self = parse_float(raw)?;
        Ok(())
    }
}

impl Bind for f32 {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        *self = parse_float(raw)? as f32;
        Ok(())
    }
}

impl Bind for String {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        raw.clone_into(self);
        Ok(())
    }
}

impl Bind for Vec<u8> {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        self.clear();
        self.extend_from_slice(raw.as_bytes());
        Ok(())
    }
}

/// `None` is filled with `T::default()` before coercing; `Some` is reused.
impl<T: Bind + Default> Bind for Option<T> {
    fn coerce(&mut self, raw: &str) -> ScanResult<()> {
        self.get_or_insert_with(T::default).coerce(raw)
    }
}
