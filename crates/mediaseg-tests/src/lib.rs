//! Integration test crate for MediaSeg.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives decoded frames from mediaseg-media through the pipelines of
//! mediaseg-segment and checks what ends up in the sinks.

#[cfg(test)]
mod support;

#[cfg(test)]
mod segmentation;

#[cfg(test)]
mod streaming;

#[cfg(test)]
mod persistence;

#[cfg(test)]
mod properties;
