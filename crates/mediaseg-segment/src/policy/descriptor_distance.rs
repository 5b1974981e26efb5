//! Content-driven windows: break when a frame's descriptor drifts away from
//! the window's anchor.

use super::SegmentationPolicy;
use crate::config::DescriptorDistanceConfig;
use crate::window::{Boundary, WindowState};
use mediaseg_core::{DescriptorValue, Distance, Frame, Result, SegmentError, Timestamp};
use tracing::debug;

/// Reference vector the open window is measured against.
#[derive(Debug, Clone, PartialEq)]
enum Anchor {
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl Anchor {
    fn distance_to(&self, distance: Distance, value: &DescriptorValue) -> Result<f64> {
        let measured = match (self, value) {
            (Self::Float(a), DescriptorValue::FloatVector(b)) => distance.between_f32(a, b),
            (Self::Double(a), DescriptorValue::DoubleVector(b)) => distance.between_f64(a, b),
            (anchor, other) => {
                return Err(SegmentError::Policy(format!(
                    "descriptor type {} does not match the anchor's {}",
                    other.kind(),
                    anchor.kind()
                )))
            }
        };
        measured.ok_or_else(|| {
            SegmentError::Policy(format!(
                "descriptor has {} dimensions, the anchor has {}",
                value.dimensions(),
                self.dimensions()
            ))
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float vector",
            Self::Double(_) => "double vector",
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }
}

/// Vector descriptors of `author` attached to `frame`.
fn author_vectors<'a>(
    author: &'a str,
    frame: &'a Frame,
) -> impl Iterator<Item = &'a DescriptorValue> {
    frame
        .descriptors_by(author)
        .map(|d| &d.value)
        .filter(|v| v.is_vector())
}

/// Keeps frames together while every vector descriptor of the configured
/// author lies within `[at_least, at_most]` of the anchor. The first vector
/// outside the range becomes the new anchor and its frame opens the next
/// window.
#[derive(Debug, Clone)]
pub struct DescriptorDistancePolicy {
    config: DescriptorDistanceConfig,
    anchor: Option<Anchor>,
    pending: Option<Boundary>,
}

impl DescriptorDistancePolicy {
    pub fn new(config: DescriptorDistanceConfig) -> Self {
        Self {
            config,
            anchor: None,
            pending: None,
        }
    }

    fn anchor_from(&self, value: &DescriptorValue) -> Result<Anchor> {
        match value {
            DescriptorValue::FloatVector(v) => Ok(Anchor::Float(v.clone())),
            DescriptorValue::DoubleVector(v) => Ok(Anchor::Double(v.clone())),
            other => Err(SegmentError::UnsupportedDescriptor {
                author: self.config.author.clone(),
                kind: other.kind().to_string(),
            }),
        }
    }
}

impl SegmentationPolicy for DescriptorDistancePolicy {
    fn name(&self) -> &'static str {
        "descriptorDistance"
    }

    fn origin(&self) -> Timestamp {
        Timestamp::MIN
    }

    fn admits(&self, frame: &Frame) -> bool {
        author_vectors(&self.config.author, frame).next().is_some()
    }

    fn observe(&mut self, frame: &Frame, state: &WindowState) -> Result<()> {
        let Some(ts) = frame.timestamp else {
            return Ok(());
        };
        let vectors: Vec<&DescriptorValue> =
            author_vectors(&self.config.author, frame).collect();

        // Element types without a distance abort the source before anything else.
        for value in &vectors {
            if matches!(
                value,
                DescriptorValue::IntVector(_) | DescriptorValue::BooleanVector(_)
            ) {
                return Err(SegmentError::UnsupportedDescriptor {
                    author: self.config.author.clone(),
                    kind: value.kind().to_string(),
                });
            }
        }

        let Some(anchor) = &self.anchor else {
            if let Some(first) = vectors.first() {
                self.anchor = Some(self.anchor_from(first)?);
            }
            return Ok(());
        };

        let mut outlier = None;
        for value in &vectors {
            let d = anchor.distance_to(self.config.distance, value)?;
            if outlier.is_none() && !self.config.in_range(d) {
                outlier = Some((*value, d));
            }
        }

        let Some((value, d)) = outlier else {
            return Ok(());
        };
        if ts <= state.cursor() {
            return Err(SegmentError::Policy(format!(
                "break at {ts} does not advance past the window start {}",
                state.cursor()
            )));
        }
        debug!(
            source = %state.source().name,
            timestamp = %ts,
            distance = d,
            "Descriptor left the anchor range"
        );
        self.anchor = Some(self.anchor_from(value)?);
        self.pending = Some(ts);
        Ok(())
    }

    fn decide(&mut self, _state: &WindowState) -> Result<Option<Boundary>> {
        Ok(self.pending.take())
    }
}
