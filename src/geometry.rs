// Polygon simplification.
//
// Segmentation polygons come in with anywhere from a handful to several
// hundred vertices. For display we only need a rough outline, so instead of a
// convex hull we take the eight axis and diagonal extrema and connect them.
// The result is an obviously artificial octagon, which tracks the extent of
// the cell well enough and can't fail on awkward input the way hull code can.

use num_traits::AsPrimitive;

use crate::cells::Point;
use crate::error::{Error, Result};

pub type Octagon = [(i64, i64); 8];

// Vertex coordinates are sums of up to three extrema, which must fit in an i64.
pub const MAX_COORDINATE: i64 = 1 << 61;

/// Bounding octagon of `poly`, traversing left, bottom, right, then top edge.
///
/// Coordinates are truncated to integers first: inputs are frequently
/// unsigned, and differences must be taken in a signed type.
pub fn octagon<T>(poly: &[(T, T)]) -> Result<Octagon>
where
    T: AsPrimitive<i64> + AsPrimitive<f64>,
{
    if poly.len() < 3 {
        return Err(Error::MalformedGeometry(format!(
            "octagon needs at least 3 points, got {}",
            poly.len()
        )));
    }

    let mut min_x = i64::MAX;
    let mut max_x = i64::MIN;
    let mut min_y = i64::MAX;
    let mut max_y = i64::MIN;
    let mut min_sum = i64::MAX;
    let mut max_sum = i64::MIN;
    let mut min_diff = i64::MAX;
    let mut max_diff = i64::MIN;

    for &(x, y) in poly {
        let (xf, yf) = (AsPrimitive::<f64>::as_(x), AsPrimitive::<f64>::as_(y));
        if !xf.is_finite() || !yf.is_finite() {
            return Err(Error::MalformedGeometry(format!(
                "non-finite polygon vertex ({xf}, {yf})"
            )));
        }
        if xf.abs() >= MAX_COORDINATE as f64 || yf.abs() >= MAX_COORDINATE as f64 {
            return Err(Error::MalformedGeometry(format!(
                "polygon vertex ({xf}, {yf}) is out of range"
            )));
        }

        let (x, y) = (AsPrimitive::<i64>::as_(x), AsPrimitive::<i64>::as_(y));
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
        min_sum = min_sum.min(x + y);
        max_sum = max_sum.max(x + y);
        min_diff = min_diff.min(y - x);
        max_diff = max_diff.max(y - x);
    }

    Ok([
        (min_x, min_sum - min_x),
        (min_x, max_diff + min_x), // left
        (max_y - max_diff, max_y),
        (max_sum - max_y, max_y), // bottom
        (max_x, max_sum - max_x),
        (max_x, min_diff + max_x), // right
        (min_y - min_diff, min_y),
        (min_sum - min_y, min_y), // top
    ])
}

/// Per-axis arithmetic mean.
pub fn mean_coord<T>(points: &[(T, T)]) -> Result<Point>
where
    T: AsPrimitive<f64>,
{
    if points.is_empty() {
        return Err(Error::MalformedGeometry(
            "cannot take the mean of an empty point set".to_string(),
        ));
    }

    let mut x = 0.0;
    let mut y = 0.0;
    for &(px, py) in points {
        x += px.as_();
        y += py.as_();
    }
    let n = points.len() as f64;
    Ok((x / n, y / n))
}

pub fn octagon_points(octagon: &Octagon) -> Vec<Point> {
    octagon.iter().map(|&(x, y)| (x as f64, y as f64)).collect()
}
