//! Descriptors attached to frames by upstream extractors.
//!
//! Segmentation never computes descriptors. It reads them (Content-Distance)
//! and carries them over into the segments it emits.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorId(pub Uuid);

impl DescriptorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DescriptorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DescriptorValue {
    FloatVector(Vec<f32>),
    DoubleVector(Vec<f64>),
    IntVector(Vec<i32>),
    BooleanVector(Vec<bool>),
    Scalar(f64),
}

impl DescriptorValue {
    /// Whether this value is a vector of any element type.
    pub fn is_vector(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Human-readable name of the value type, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FloatVector(_) => "float vector",
            Self::DoubleVector(_) => "double vector",
            Self::IntVector(_) => "int vector",
            Self::BooleanVector(_) => "boolean vector",
            Self::Scalar(_) => "scalar",
        }
    }

    /// Number of elements (1 for scalars).
    pub fn dimensions(&self) -> usize {
        match self {
            Self::FloatVector(v) => v.len(),
            Self::DoubleVector(v) => v.len(),
            Self::IntVector(v) => v.len(),
            Self::BooleanVector(v) => v.len(),
            Self::Scalar(_) => 1,
        }
    }
}

/// A feature value produced by an upstream extractor (the `author`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: DescriptorId,
    /// Name of the extractor that produced this descriptor.
    pub author: Arc<str>,
    pub value: DescriptorValue,
}

impl Descriptor {
    pub fn new(author: impl Into<Arc<str>>, value: DescriptorValue) -> Self {
        Self {
            id: DescriptorId::new(),
            author: author.into(),
            value,
        }
    }

    /// Convenience constructor for a float vector descriptor.
    pub fn float_vector(author: impl Into<Arc<str>>, vector: Vec<f32>) -> Self {
        Self::new(author, DescriptorValue::FloatVector(vector))
    }

    pub fn is_from(&self, author: &str) -> bool {
        &*self.author == author
    }
}
