//! Interpolation kernels for grid resampling.
//!
//! Coordinates are fractional source pixel indices where `(0.0, 0.0)` is the
//! centre of the first cell. Invalid cells are passed in as NaN.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RasterOpsError;

/// Interpolation method for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    #[default]
    Bilinear,
    /// Bicubic Catmull-Rom interpolation (smoothest, more compute).
    Cubic,
}

impl FromStr for InterpolationMethod {
    type Err = RasterOpsError;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            "cubic" | "bicubic" => Ok(Self::Cubic),
            _ => Err(RasterOpsError::UnknownInterpolation(s.to_string())),
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

impl InterpolationMethod {
    /// Sample `data` at fractional pixel `(x, y)`.
    pub fn sample(&self, data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
        match self {
            Self::Nearest => nearest_interpolate(data, width, height, x, y),
            Self::Bilinear => bilinear_interpolate(data, width, height, x, y),
            Self::Cubic => cubic_interpolate(data, width, height, x, y),
        }
    }
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point, NaN included.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let col = x.round().clamp(0.0, (width - 1) as f64) as usize;
    let row = y.round().clamp(0.0, (height - 1) as f64) as usize;
    data[row * width + col]
}

/// Bilinear interpolation.
///
/// Weights are renormalised over the valid corners, so a NaN corner only
/// yields NaN when every corner with a non-zero weight is NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let corners = [
        (data[y0 * width + x0], (1.0 - xf) * (1.0 - yf)),
        (data[y0 * width + x1], xf * (1.0 - yf)),
        (data[y1 * width + x0], (1.0 - xf) * yf),
        (data[y1 * width + x1], xf * yf),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (v, w) in corners {
        if !v.is_nan() && w > 0.0 {
            sum += v as f64 * w;
            weight += w;
        }
    }

    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}

/// Bicubic interpolation.
///
/// Uses 16 surrounding points; falls back to bilinear when any is NaN.
pub fn cubic_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let xf = x - xi as f64;
    let yf = y - yi as f64;

    let mut values = [[0.0f64; 4]; 4];

    for j in 0..4 {
        for i in 0..4 {
            let px = (xi + i as i64 - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j as i64 - 1).clamp(0, height as i64 - 1) as usize;
            let v = data[py * width + px];

            if v.is_nan() {
                return bilinear_interpolate(data, width, height, x, y);
            }
            values[j][i] = v as f64;
        }
    }

    let mut row_values = [0.0f64; 4];
    for j in 0..4 {
        row_values[j] = cubic_1d(values[j][0], values[j][1], values[j][2], values[j][3], xf);
    }

    cubic_1d(row_values[0], row_values[1], row_values[2], row_values[3], yf) as f32
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
        ];

        assert_eq!(nearest_interpolate(&data, 3, 3, 0.0, 0.0), 1.0);
        assert_eq!(nearest_interpolate(&data, 3, 3, 1.0, 1.0), 5.0);
        assert_eq!(nearest_interpolate(&data, 3, 3, 0.4, 0.4), 1.0);
        assert_eq!(nearest_interpolate(&data, 3, 3, 0.6, 0.6), 5.0);
        // Edge half-pixels clamp to the border cell
        assert_eq!(nearest_interpolate(&data, 3, 3, -0.4, 2.4), 7.0);
    }

    #[test]
    fn test_bilinear_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];

        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 0.0), 2.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 1.0), 3.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 4.0);

        let center = bilinear_interpolate(&data, 2, 2, 0.5, 0.5);
        assert!((center - 2.5).abs() < 0.001);

        // Outside the centre lattice clamps instead of extrapolating
        assert_eq!(bilinear_interpolate(&data, 2, 2, -0.25, -0.25), 1.0);
    }

    #[test]
    fn test_bilinear_renormalises_over_valid_corners() {
        let data: Vec<f32> = vec![
            1.0, f32::NAN,
            3.0, 5.0,
        ];

        // Remaining weights are equal, so the result is their mean
        let result = bilinear_interpolate(&data, 2, 2, 0.5, 0.5);
        assert!((result - 3.0).abs() < 1e-6);

        let all_nan = vec![f32::NAN; 4];
        assert!(bilinear_interpolate(&all_nan, 2, 2, 0.5, 0.5).is_nan());
    }

    #[test]
    fn test_cubic_reproduces_linear_ramp() {
        let data: Vec<f32> = (0..25).map(|i| (i % 5) as f32).collect();
        let v = cubic_interpolate(&data, 5, 5, 1.5, 2.0);
        assert!((v - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_cubic_falls_back_on_nan() {
        let mut data: Vec<f32> = vec![2.0; 16];
        data[0] = f32::NAN;
        let v = cubic_interpolate(&data, 4, 4, 1.5, 1.5);
        assert!((v - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("nearest".parse::<InterpolationMethod>().unwrap(), InterpolationMethod::Nearest);
        assert_eq!("BILINEAR".parse::<InterpolationMethod>().unwrap(), InterpolationMethod::Bilinear);
        assert_eq!("bicubic".parse::<InterpolationMethod>().unwrap(), InterpolationMethod::Cubic);
        assert!(matches!(
            "lanczos".parse::<InterpolationMethod>(),
            Err(RasterOpsError::UnknownInterpolation(_))
        ));
        assert_eq!(InterpolationMethod::default(), InterpolationMethod::Bilinear);
    }
}
