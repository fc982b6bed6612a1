use clap::ValueEnum;
use json::JsonValue;

use crate::cells::Point;
use crate::error::{Error, Result};

// Raster-based picking in the viewer limits how large the coordinate space can
// usefully be, hence the rather small default.
pub const DEFAULT_DOMAIN: f64 = 2000.0;
pub const DEFAULT_PRECISION: u32 = 2;
/// Beyond this, `10^digits` loses integer precision and rounding stops meaning anything.
pub const MAX_PRECISION: u32 = 15;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ScalingPolicy {
    /// Stretch each axis to span the full domain.
    #[default]
    Independent,
    /// One scale for both axes, chosen so the shorter axis spans the domain.
    Uniform,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformConfig {
    pub domain: f64,
    pub policy: ScalingPolicy,
    /// Decimal digits kept after transforming.
    pub precision: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            domain: DEFAULT_DOMAIN,
            policy: ScalingPolicy::Independent,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.domain.is_finite() || self.domain <= 0.0 {
            return Err(Error::invalid_input(
                "domain",
                format!("must be positive, got {}", self.domain),
            ));
        }
        check_precision(self.precision)
    }
}

pub fn check_precision(digits: u32) -> Result<()> {
    if digits > MAX_PRECISION {
        return Err(Error::invalid_input(
            "precision",
            format!("at most {MAX_PRECISION} digits are supported, got {digits}"),
        ));
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub x_shift: f64,
    pub y_shift: f64,
    pub x_scale: f64,
    pub y_scale: f64,
}

impl Transform {
    pub fn to_json(&self) -> JsonValue {
        let mut transform = JsonValue::new_object();
        transform["x_shift"] = self.x_shift.into();
        transform["y_shift"] = self.y_shift.into();
        transform["x_scale"] = self.x_scale.into();
        transform["y_scale"] = self.y_scale.into();
        transform
    }
}

pub fn coordinate_span<'a, I>(points: I) -> Option<(f64, f64, f64, f64)>
where
    I: IntoIterator<Item = &'a Point>,
{
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    let mut count = 0;

    for &(x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some((min_x, max_x, min_y, max_y))
    }
}

/// Shift that centers the centroids' bounding box on the origin, and a scale
/// that maps it onto `config.domain`.
pub fn compute_transform(centroids: &[Point], config: &TransformConfig) -> Result<Transform> {
    if let Some(&(x, y)) = centroids.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(Error::MalformedGeometry(format!(
            "non-finite centroid ({x}, {y})"
        )));
    }

    let (min_x, max_x, min_y, max_y) = coordinate_span(centroids).ok_or_else(|| {
        Error::MalformedGeometry("cannot compute a transform without centroids".to_string())
    })?;

    let x_extent = max_x - min_x;
    let y_extent = max_y - min_y;

    let (x_scale, y_scale) = match config.policy {
        ScalingPolicy::Independent => {
            if x_extent <= 0.0 || y_extent <= 0.0 {
                return Err(Error::MalformedGeometry(format!(
                    "centroids have zero extent (x: {x_extent}, y: {y_extent})"
                )));
            }
            (config.domain / x_extent, config.domain / y_extent)
        }
        ScalingPolicy::Uniform => {
            let extent = x_extent.min(y_extent);
            if extent <= 0.0 {
                return Err(Error::MalformedGeometry(format!(
                    "centroids have zero extent (x: {x_extent}, y: {y_extent})"
                )));
            }
            let scale = config.domain / extent;
            (scale, scale)
        }
    };

    Ok(Transform {
        x_shift: -(max_x + min_x) / 2.0,
        y_shift: -(max_y + min_y) / 2.0,
        x_scale,
        y_scale,
    })
}

pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10_f64.powi(digits as i32);
    (value * factor).round() / factor
}

pub fn apply_transform(transform: &Transform, xy: Point, precision: u32) -> Point {
    (
        round_to((xy.0 + transform.x_shift) * transform.x_scale, precision),
        round_to((xy.1 + transform.y_shift) * transform.y_scale, precision),
    )
}
