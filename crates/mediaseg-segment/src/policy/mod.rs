//! Segmentation policies: when does the open window close?
//!
//! A policy instance is created per source and only ever sees that source's
//! frames. The pipeline calls it under the source's lock in this order for
//! every frame: [`admits`](SegmentationPolicy::admits), then (for frames that
//! are not late) [`observe`](SegmentationPolicy::observe), then after the
//! frame is buffered [`decide`](SegmentationPolicy::decide) until it returns
//! `None`.

mod descriptor_distance;
mod fixed;
mod pass_through;
mod shot_boundary;

pub use descriptor_distance::DescriptorDistancePolicy;
pub use fixed::FixedDurationPolicy;
pub use pass_through::PassThroughPolicy;
pub use shot_boundary::ShotBoundaryPolicy;

use crate::boundary::BoundaryProvider;
use crate::config::PolicyConfig;
use crate::window::{Boundary, WindowState};
use mediaseg_core::{Frame, Result, SegmentError, Source, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Decides where windows of one source close.
pub trait SegmentationPolicy: Send {
    fn name(&self) -> &'static str;

    /// Start of the first window.
    fn origin(&self) -> Timestamp {
        Timestamp::ZERO
    }

    /// Whether `frame` takes part in segmentation at all.
    fn admits(&self, _frame: &Frame) -> bool {
        true
    }

    /// Look at a frame before it is buffered.
    fn observe(&mut self, _frame: &Frame, _state: &WindowState) -> Result<()> {
        Ok(())
    }

    /// The boundary at which the open window should close now, if any.
    fn decide(&mut self, state: &WindowState) -> Result<Option<Boundary>>;

    /// The boundary to close at while draining. Called repeatedly until the
    /// buffer is empty; must lie past the cursor.
    fn flush_boundary(&mut self, _state: &WindowState) -> Boundary {
        Timestamp::MAX
    }

    /// Alignment tolerance recorded on the windows this policy closes.
    fn tolerance(&self) -> Option<Duration> {
        None
    }
}

/// Builds one policy instance per source from a validated configuration.
pub struct PolicyFactory {
    config: PolicyConfig,
    provider: Option<Arc<dyn BoundaryProvider>>,
}

impl std::fmt::Debug for PolicyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyFactory")
            .field("config", &self.config)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl PolicyFactory {
    /// Fails if a shot-boundary policy is configured without a matching provider.
    pub fn new(config: PolicyConfig, provider: Option<Arc<dyn BoundaryProvider>>) -> Result<Self> {
        if let PolicyConfig::ShotBoundary(sb) = &config {
            match &provider {
                None => {
                    return Err(SegmentError::config(
                        "sbProvider",
                        format!("names '{}' but no boundary provider was supplied", sb.provider),
                    ))
                }
                Some(p) if p.name() != sb.provider => {
                    return Err(SegmentError::config(
                        "sbProvider",
                        format!(
                            "names '{}' but the supplied provider is '{}'",
                            sb.provider,
                            p.name()
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// A fresh policy for `source`.
    pub fn create(&self, source: &Source) -> Box<dyn SegmentationPolicy> {
        match &self.config {
            PolicyConfig::FixedDuration(c) => Box::new(FixedDurationPolicy::new(*c)),
            PolicyConfig::ShotBoundary(c) => {
                let shots = match &self.provider {
                    Some(provider) => match provider.lookup(&c.set_name, source.stem()) {
                        Ok(Some(shots)) => Some(shots),
                        Ok(None) => {
                            warn!(
                                source = %source.name,
                                set = %c.set_name,
                                "No shot boundaries for source, using fixed windows"
                            );
                            None
                        }
                        Err(e) => {
                            warn!(
                                source = %source.name,
                                set = %c.set_name,
                                error = %e,
                                "Shot boundary lookup failed, using fixed windows"
                            );
                            None
                        }
                    },
                    None => None,
                };
                Box::new(ShotBoundaryPolicy::new(c.clone(), shots.unwrap_or_default()))
            }
            PolicyConfig::DescriptorDistance(c) => {
                Box::new(DescriptorDistancePolicy::new(c.clone()))
            }
            PolicyConfig::PassThrough => Box::new(PassThroughPolicy),
        }
    }
}
