//! Codec registry.
//!
//! Maps element types to their column codec. The table is built once, on
//! first use, and never mutated afterwards, so lookups take no lock.

use chrono::{DateTime, FixedOffset, Utc};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::column::Codec;
use super::timezone::{default_timezone, Timezone};
use super::TypeError;
use crate::parser::parse_type_name;

/// Element types an `Array` can hold.
///
/// The discriminant is the stable envelope type id; new variants take new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float32 = 9,
    Float64 = 10,
    String = 11,
    DateTime = 12,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::String,
        ElementType::DateTime,
    ];

    /// Envelope type id.
    pub fn id(self) -> u64 {
        self as u8 as u64
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.id() == id)
    }

    /// Rust element type this variant stands for.
    pub fn rust_name(self) -> &'static str {
        match self {
            ElementType::Int8 => "i8",
            ElementType::Int16 => "i16",
            ElementType::Int32 => "i32",
            ElementType::Int64 => "i64",
            ElementType::UInt8 => "u8",
            ElementType::UInt16 => "u16",
            ElementType::UInt32 => "u32",
            ElementType::UInt64 => "u64",
            ElementType::Float32 => "f32",
            ElementType::Float64 => "f64",
            ElementType::String => "String",
            ElementType::DateTime => "DateTime<FixedOffset>",
        }
    }
}

pub struct Registry {
    codecs: HashMap<ElementType, Codec>,
    by_type: HashMap<TypeId, ElementType>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::build);

impl Registry {
    /// The process-wide table.
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    fn build() -> Self {
        let codecs = HashMap::from([
            (ElementType::Int8, Codec::Int8),
            (ElementType::Int16, Codec::Int16),
            (ElementType::Int32, Codec::Int32),
            (ElementType::Int64, Codec::Int64),
            (ElementType::UInt8, Codec::UInt8),
            (ElementType::UInt16, Codec::UInt16),
            (ElementType::UInt32, Codec::UInt32),
            (ElementType::UInt64, Codec::UInt64),
            (ElementType::Float32, Codec::Float32),
            (ElementType::Float64, Codec::Float64),
            (ElementType::String, Codec::String),
            (
                ElementType::DateTime,
                Codec::DateTime {
                    timezone: Timezone::Local,
                    is_full: true,
                },
            ),
        ]);

        let by_type = HashMap::from([
            (TypeId::of::<i8>(), ElementType::Int8),
            (TypeId::of::<i16>(), ElementType::Int16),
            (TypeId::of::<i32>(), ElementType::Int32),
            (TypeId::of::<i64>(), ElementType::Int64),
            (TypeId::of::<u8>(), ElementType::UInt8),
            (TypeId::of::<u16>(), ElementType::UInt16),
            (TypeId::of::<u32>(), ElementType::UInt32),
            (TypeId::of::<u64>(), ElementType::UInt64),
            (TypeId::of::<f32>(), ElementType::Float32),
            (TypeId::of::<f64>(), ElementType::Float64),
            (TypeId::of::<String>(), ElementType::String),
            (TypeId::of::<DateTime<FixedOffset>>(), ElementType::DateTime),
            (TypeId::of::<DateTime<Utc>>(), ElementType::DateTime),
        ]);

        tracing::trace!(codecs = codecs.len(), "codec registry built");
        Self { codecs, by_type }
    }

    /// Element type registered for the Rust type `T`.
    pub fn element_type_of<T: 'static>(&self) -> Option<ElementType> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Codec for an element type.
    ///
    /// `timezone` only affects `DateTime`; `None` falls back to the process
    /// default.
    pub fn codec(&self, ty: ElementType, timezone: Option<Timezone>) -> Option<Codec> {
        let codec = self.codecs.get(&ty)?;
        Some(match codec {
            Codec::DateTime { is_full, .. } => Codec::DateTime {
                timezone: timezone.unwrap_or_else(default_timezone),
                is_full: *is_full,
            },
            other => other.clone(),
        })
    }

    /// Codec for a declared column type name, e.g. `"Int32"` or
    /// `"DateTime('UTC')"`.
    pub fn factory(&self, type_name: &str, timezone: Timezone) -> Result<Codec, TypeError> {
        parse_type_name(type_name, timezone)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
