//! Nearest-time lookup, viewport y-limits and draw-budget downsampling.

/// Value at the recorded time closest to `t`, if that time is within
/// `tolerance`.
///
/// `times` must be sorted ascending and parallel to `values`. When both
/// neighbours are equally close, the later one wins.
pub fn nearest_by_time(times: &[f64], values: &[f64], t: f64, tolerance: f64) -> Option<f64> {
    let n = times.len().min(values.len());
    if n == 0 {
        return None;
    }
    let times = &times[..n];
    let i = times.partition_point(|&x| x < t);
    let mut best: Option<(usize, f64)> = None;
    for j in [Some(i), i.checked_sub(1)].into_iter().flatten() {
        if j >= n {
            continue;
        }
        let dt = (times[j] - t).abs();
        if best.map_or(true, |(_, b)| dt < b) {
            best = Some((j, dt));
        }
    }
    best.filter(|&(_, dt)| dt <= tolerance).map(|(j, _)| values[j])
}

/// Stride used to bring `len` points down to at most `budget`.
pub fn stride_for(len: usize, budget: usize) -> usize {
    if budget == 0 || len <= budget {
        1
    } else {
        len.div_ceil(budget)
    }
}

/// Keep every Nth element (N = ceil(len / budget)), starting with the first.
/// Inputs at or below the budget are returned unchanged.
pub fn downsample<T: Copy>(xs: &[T], budget: usize) -> Vec<T> {
    let stride = stride_for(xs.len(), budget);
    xs.iter().step_by(stride).copied().collect()
}

/// [`downsample`] applied with the same stride to parallel x/y sequences.
pub fn downsample_xy(xs: &[f64], ys: &[f64], budget: usize) -> (Vec<f64>, Vec<f64>) {
    let n = xs.len().min(ys.len());
    let stride = stride_for(n, budget);
    let mut out_x = Vec::with_capacity(n / stride + 1);
    let mut out_y = Vec::with_capacity(n / stride + 1);
    for i in (0..n).step_by(stride) {
        out_x.push(xs[i]);
        out_y.push(ys[i]);
    }
    (out_x, out_y)
}

/// Y range of the points whose x lies in `[x0, x1]`.
///
/// A span narrower than `min_span` is widened to it around its midpoint, then
/// both ends are padded by `pad_frac` of the span. `None` when no point is inside the window.
pub fn y_limits(
    xs: &[f64],
    ys: &[f64],
    x0: f64,
    x1: f64,
    pad_frac: f64,
    min_span: f64,
) -> Option<(f64, f64)> {
    let (lo, hi) = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| (x0..=x1).contains(*x) && y.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, (_, &y)| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;
    let (lo, hi) = if hi - lo < min_span {
        let mid = 0.5 * (lo + hi);
        (mid - 0.5 * min_span, mid + 0.5 * min_span)
    } else {
        (lo, hi)
    };
    let pad = (hi - lo) * pad_frac;
    Some((lo - pad, hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_within_tolerance() {
        let t = [1.0, 2.0, 5.0];
        let v = [10.0, 20.0, 50.0];
        assert_eq!(nearest_by_time(&t, &v, 2.2, 0.3), Some(20.0));
        assert_eq!(nearest_by_time(&t, &v, 3.5, 0.3), None);
        assert_eq!(nearest_by_time(&t, &v, 0.8, 0.3), Some(10.0));
        assert_eq!(nearest_by_time(&t, &v, 5.3, 0.3), Some(50.0));
        assert_eq!(nearest_by_time(&t, &v, 1.0, 0.0), Some(10.0));
    }

    #[test]
    fn nearest_on_empty_series() {
        assert_eq!(nearest_by_time(&[], &[], 1.0, 10.0), None);
    }

    #[test]
    fn nearest_picks_closer_neighbour() {
        let t = [0.0, 1.0];
        let v = [0.0, 1.0];
        assert_eq!(nearest_by_time(&t, &v, 0.4, 1.0), Some(0.0));
        assert_eq!(nearest_by_time(&t, &v, 0.6, 1.0), Some(1.0));
    }

    #[test]
    fn downsample_is_identity_within_budget() {
        let xs: Vec<i32> = (0..10).collect();
        assert_eq!(downsample(&xs, 10), xs);
        assert_eq!(downsample(&xs, 50), xs);
    }

    #[test]
    fn downsample_uses_ceil_stride_from_first() {
        let xs: Vec<i32> = (0..10).collect();
        // ceil(10 / 4) = 3
        assert_eq!(downsample(&xs, 4), vec![0, 3, 6, 9]);
        let xs: Vec<i32> = (0..10_000).collect();
        let out = downsample(&xs, 2500);
        assert_eq!(out.len(), 2500);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 4);
    }

    #[test]
    fn downsample_xy_keeps_pairs_aligned() {
        let xs: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x * 10.0).collect();
        let (dx, dy) = downsample_xy(&xs, &ys, 3);
        assert_eq!(dx, vec![0.0, 3.0, 6.0]);
        assert_eq!(dy, vec![0.0, 30.0, 60.0]);
    }

    #[test]
    fn y_limits_only_consider_window() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [100.0, 10.0, 20.0, -100.0];
        let (lo, hi) = y_limits(&xs, &ys, 1.0, 2.0, 0.08, 0.3).unwrap();
        assert!((lo - (10.0 - 0.8)).abs() < 1e-9);
        assert!((hi - (20.0 + 0.8)).abs() < 1e-9);
    }

    #[test]
    fn y_limits_floor_span_for_flat_signal() {
        let xs = [0.0, 1.0];
        let ys = [21.0, 21.0];
        let (lo, hi) = y_limits(&xs, &ys, 0.0, 1.0, 0.08, 0.3).unwrap();
        assert!((hi - lo - (0.3 + 2.0 * 0.3 * 0.08)).abs() < 1e-9);
        assert!(lo < 21.0 && hi > 21.0);
    }

    #[test]
    fn y_limits_empty_window() {
        assert_eq!(y_limits(&[0.0], &[1.0], 5.0, 6.0, 0.08, 0.3), None);
    }
}
