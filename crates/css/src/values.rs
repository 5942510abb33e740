//! The tagged value representation shared by the cascade and the value
//! managers.
//!
//! The engine itself only distinguishes `Inherit` and the `Computed` wrapper;
//! every other variant is manager territory.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Px,
    Em,
    Rem,
    Percent,
    Other(String),
}

impl Unit {
    pub fn from_name(unit: &str) -> Self {
        match unit.to_ascii_lowercase().as_str() {
            "px" => Unit::Px,
            "em" => Unit::Em,
            "rem" => Unit::Rem,
            "%" => Unit::Percent,
            other => Unit::Other(other.to_string()),
        }
    }
}

/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The CSS `inherit` keyword.
    Inherit,
    Ident(String),
    Number(f32),
    Length { value: f32, unit: Unit },
    Percentage(f32),
    Color(Rgba),
    Uri(String),
    /// Wrapper retaining both the cascaded and the computed form of a value
    /// whose computation changed it; re-computation after invalidation
    /// starts again from the cascaded half.
    Computed {
        cascaded: Arc<Value>,
        computed: Arc<Value>,
    },
}

impl Value {
    #[inline]
    pub fn is_inherit(&self) -> bool {
        matches!(self, Value::Inherit)
    }

    /// The computed half of a `Computed` wrapper, or the value itself.
    pub fn resolved(self: &Arc<Value>) -> Arc<Value> {
        match &**self {
            Value::Computed { computed, .. } => computed.clone(),
            _ => self.clone(),
        }
    }

    /// The cascaded half of a `Computed` wrapper, or the value itself.
    pub fn cascaded(self: &Arc<Value>) -> Arc<Value> {
        match &**self {
            Value::Computed { cascaded, .. } => cascaded.clone(),
            _ => self.clone(),
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Value::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The pixel magnitude of an absolute length.
    pub fn as_px(&self) -> Option<f32> {
        match self {
            Value::Length {
                value,
                unit: Unit::Px,
            } => Some(*value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn px(value: f32) -> Value {
        Value::Length {
            value,
            unit: Unit::Px,
        }
    }
}
