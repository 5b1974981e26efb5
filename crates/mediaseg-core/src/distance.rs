//! Vector distance functions used for content-driven segmentation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A distance between two vectors of equal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distance {
    /// L2 norm of the difference.
    Euclidean,
    /// L1 norm of the difference.
    Manhattan,
    /// `1 - cos(a, b)`; zero-length vectors are at distance 1 from everything.
    Cosine,
}

impl Distance {
    /// Distance between two `f32` vectors, or `None` if their lengths differ.
    pub fn between_f32(self, a: &[f32], b: &[f32]) -> Option<f64> {
        self.between(a.iter().map(|&x| x as f64), b.iter().map(|&x| x as f64), a.len(), b.len())
    }

    /// Distance between two `f64` vectors, or `None` if their lengths differ.
    pub fn between_f64(self, a: &[f64], b: &[f64]) -> Option<f64> {
        self.between(a.iter().copied(), b.iter().copied(), a.len(), b.len())
    }

    fn between<A, B>(self, a: A, b: B, len_a: usize, len_b: usize) -> Option<f64>
    where
        A: Iterator<Item = f64>,
        B: Iterator<Item = f64>,
    {
        if len_a != len_b {
            return None;
        }
        let pairs = a.zip(b);
        let value = match self {
            Self::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
            Self::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Self::Cosine => {
                let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
                for (x, y) in pairs {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                let denom = norm_a.sqrt() * norm_b.sqrt();
                if denom == 0.0 {
                    1.0
                } else {
                    1.0 - dot / denom
                }
            }
        };
        Some(value)
    }

    /// Canonical lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a distance name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDistance(pub String);

impl fmt::Display for UnknownDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown distance '{}' (expected euclidean, manhattan or cosine)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDistance {}

impl FromStr for Distance {
    type Err = UnknownDistance;

    /// Case-insensitive; accepts `l1`/`l2` as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            "cosine" => Ok(Self::Cosine),
            _ => Err(UnknownDistance(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean() {
        let d = Distance::Euclidean.between_f32(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_manhattan() {
        let d = Distance::Manhattan.between_f64(&[1.0, -1.0], &[2.0, 1.0]).unwrap();
        assert!((d - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine() {
        let same = Distance::Cosine.between_f32(&[1.0, 0.0], &[2.0, 0.0]).unwrap();
        assert!(same.abs() < 1e-9);
        let orthogonal = Distance::Cosine.between_f32(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((orthogonal - 1.0).abs() < 1e-9);
        let zero = Distance::Cosine.between_f32(&[0.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((zero - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(Distance::Euclidean.between_f32(&[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("EUCLIDEAN".parse::<Distance>().unwrap(), Distance::Euclidean);
        assert_eq!("l1".parse::<Distance>().unwrap(), Distance::Manhattan);
        assert_eq!(" Cosine ".parse::<Distance>().unwrap(), Distance::Cosine);
        assert!("hamming".parse::<Distance>().is_err());
    }
}
