//! Mapping between the domain types in [`crate::discord`] and Discord's JSON.
//!
//! Every wire type brings its own rule by implementing [`Encode`] and/or
//! [`Decode`]; the [`Codec`] only carries the shared [`RenderContext`] and
//! picks the rule from the static type of the value handed to it. Enum types
//! bound to integers implement [`WireEnum`].

use std::{convert::TryFrom, fmt, sync::Arc};

use serde_json::Value;

use crate::{
    discord::embed::EmbedFooter,
    error::{DecodeError, EncodeError},
};

/// Closed set of variants, each bound to a fixed integer on the wire.
pub trait WireEnum: Copy + PartialEq + fmt::Debug + Sized + 'static {
    const VARIANTS: &'static [Self];

    fn code(self) -> u8;

    // unknown codes are not an error, callers decide what absent means
    fn from_code(code: u8) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.code() == code)
    }
}

// declares an integer-coded enum with explicit discriminants
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde_repr::Serialize_repr,
            serde_repr::Deserialize_repr,
        )]
        #[repr(u8)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant = $code),+
        }

        impl $crate::codec::WireEnum for $name {
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

pub fn encode_enum<E: WireEnum>(variant: E) -> Value {
    Value::from(variant.code())
}

pub fn decode_enum<E: WireEnum>(value: &Value) -> Option<E> {
    value
        .as_u64()
        .and_then(|code| u8::try_from(code).ok())
        .and_then(E::from_code)
}

/// Session-derived defaults consulted while rendering embeds.
pub trait RenderContext: Send + Sync {
    fn default_color(&self) -> Option<u32> {
        None
    }

    fn default_footer(&self) -> Option<EmbedFooter> {
        None
    }
}

/// Context without a session. Contributes nothing to the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainContext;

impl RenderContext for PlainContext {}

pub trait Encode {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError>;
}

pub trait Decode: Sized {
    fn decode(value: Value) -> Result<Self, DecodeError>;
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError> {
        self.iter()
            .map(|item| item.encode(cx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError> {
        self.as_slice().encode(cx)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::decode).collect(),
            _ => Err(DecodeError::Unexpected {
                target: "list",
                expected: "an array",
            }),
        }
    }
}

pub(crate) fn into_object(
    value: Value,
    target: &'static str,
) -> Result<serde_json::Map<String, Value>, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::Unexpected {
            target,
            expected: "an object",
        }),
    }
}

#[derive(Clone)]
pub struct Codec {
    context: Arc<dyn RenderContext>,
}

impl Codec {
    pub fn new(context: Arc<dyn RenderContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    pub fn encode<T: Encode + ?Sized>(&self, value: &T) -> Result<Value, EncodeError> {
        value.encode(self.context())
    }

    /// Compact UTF-8 JSON, as sent in request bodies.
    pub fn to_vec<T: Encode + ?Sized>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(&self.encode(value)?)?)
    }

    /// Human readable JSON for logs. Decodes to the same value as [`Codec::to_vec`].
    pub fn to_string_pretty<T: Encode + ?Sized>(&self, value: &T) -> Result<String, EncodeError> {
        Ok(serde_json::to_string_pretty(&self.encode(value)?)?)
    }

    pub fn decode<T: Decode>(&self, value: Value) -> Result<T, DecodeError> {
        T::decode(value)
    }

    pub fn decode_slice<T: Decode>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        T::decode(serde_json::from_slice(bytes)?)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(PlainContext))
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}
