use std::array;

/// A single vertex position, stored in (x, y, z) order.
pub type Vertex = [f64; 3];

/// Number of coordinate axes of a [Vertex].
pub const NUM_AXES: usize = 3;

pub trait ConfigType {
    fn default() -> Self;
}

#[inline]
pub(crate) fn sub(a: Vertex, b: Vertex) -> Vertex {
    array::from_fn(|i| a[i] - b[i])
}

#[inline]
pub(crate) fn norm(v: Vertex) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Returns the per-axis minimum and maximum of the given vertices.
/// Both are zero for an empty slice. NaN coordinates are skipped, so an axis is only NaN
/// when every value on it is.
pub(crate) fn axis_bounds(vertices: &[Vertex]) -> (Vertex, Vertex) {
    let Some(first) = vertices.first() else {
        return ([0.0; NUM_AXES], [0.0; NUM_AXES]);
    };
    let mut min = *first;
    let mut max = *first;
    for v in &vertices[1..] {
        for i in 0..NUM_AXES {
            min[i] = min[i].min(v[i]);
            max[i] = max[i].max(v[i]);
        }
    }
    (min, max)
}

/// Returns the per-axis arithmetic mean. Zero for an empty slice.
pub(crate) fn axis_mean(vertices: &[Vertex]) -> Vertex {
    if vertices.is_empty() {
        return [0.0; NUM_AXES];
    }
    let mut sum = [0.0; NUM_AXES];
    for v in vertices {
        for i in 0..NUM_AXES {
            sum[i] += v[i];
        }
    }
    let n = vertices.len() as f64;
    sum.map(|s| s / n)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_and_mean() {
        let vertices = vec![
            [1.0, -2.0, 3.0],
            [-1.0, 4.0, 3.0],
            [0.0, 1.0, 0.0],
        ];
        let (min, max) = axis_bounds(&vertices);
        assert_eq!(min, [-1.0, -2.0, 0.0]);
        assert_eq!(max, [1.0, 4.0, 3.0]);
        assert_eq!(axis_mean(&vertices), [0.0, 1.0, 2.0]);
    }

    #[test]
    fn bounds_skip_nan() {
        let vertices = vec![
            [f64::NAN, 1.0, f64::NAN],
            [2.0, f64::NAN, f64::NAN],
            [-3.0, 5.0, f64::NAN],
        ];
        let (min, max) = axis_bounds(&vertices);
        assert_eq!((min[0], max[0]), (-3.0, 2.0));
        assert_eq!((min[1], max[1]), (1.0, 5.0));
        assert!(min[2].is_nan() && max[2].is_nan());
    }

    #[test]
    fn empty_slice_is_zero() {
        assert_eq!(axis_bounds(&[]), ([0.0; 3], [0.0; 3]));
        assert_eq!(axis_mean(&[]), [0.0; 3]);
    }

    #[test]
    fn norm_of_difference() {
        let d = sub([4.0, 6.0, 1.0], [1.0, 2.0, 1.0]);
        assert_eq!(d, [3.0, 4.0, 0.0]);
        assert_eq!(norm(d), 5.0);
    }
}
