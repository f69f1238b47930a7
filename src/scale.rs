/// Nine-step sequential green palette, lightest first.
pub const GREENS_9: [&str; 9] = [
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b",
];

/// Fill for counties without an education record.
pub const FALLBACK_FILL: &str = "#ccc";

pub type ColorScale = QuantizeScale<&'static str>;

/// Maps a continuous domain onto a discrete range using equal-width bins.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeScale<R> {
    domain: (f64, f64),
    thresholds: Vec<f64>,
    range: Vec<R>,
}

impl<R> QuantizeScale<R> {
    pub fn new(domain: (f64, f64), range: Vec<R>) -> Self {
        let (x0, x1) = domain;
        let n = range.len().saturating_sub(1);
        let thresholds = (0..n)
            .map(|i| {
                let i = i as f64;
                let n = n as f64;
                ((i + 1.0) * x1 - (i - n) * x0) / (n + 1.0)
            })
            .collect();
        Self {
            domain,
            thresholds,
            range,
        }
    }

    /// A value equal to a bin boundary belongs to the upper bin.
    pub fn apply(&self, x: f64) -> Option<&R> {
        if x.is_nan() {
            return None;
        }
        let bin = self.thresholds.partition_point(|t| *t <= x);
        self.range.get(bin)
    }

    /// The `[lo, hi)` sub-range of the domain that maps to range entry `i`.
    pub fn invert_extent(&self, i: usize) -> Option<(f64, f64)> {
        if i >= self.range.len() {
            return None;
        }
        let (x0, x1) = self.domain;
        let t = &self.thresholds;
        let n = t.len();
        Some(match i {
            _ if n == 0 => (x0, x1),
            0 => (x0, t[0]),
            i if i >= n => (t[n - 1], x1),
            i => (t[i - 1], t[i]),
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn range(&self) -> &[R] {
        &self.range
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        // a collapsed domain maps everything to the middle of the range
        let t = if span == 0.0 { 0.5 } else { (x - d0) / span };
        r0 + t * (r1 - r0)
    }
}

/// Minimum and maximum, ignoring NaN. `None` when nothing comparable remains.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Green quantize scale over the extent of `values`; an empty input gives
/// the degenerate domain `[0, 0]`.
pub fn color_scale(values: impl IntoIterator<Item = f64>) -> ColorScale {
    let domain = extent(values).unwrap_or((0.0, 0.0));
    QuantizeScale::new(domain, GREENS_9.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_split_domain_evenly() {
        let scale = QuantizeScale::new((0.0, 90.0), GREENS_9.to_vec());
        let expected: Vec<f64> = (1..9).map(|i| i as f64 * 10.0).collect();
        for (t, e) in scale.thresholds().iter().zip(&expected) {
            assert!((t - e).abs() < 1e-9, "{t} vs {e}");
        }
        assert_eq!(scale.thresholds().len(), 8);
    }

    #[test]
    fn apply_bins_values() {
        let scale = color_scale([10.0, 50.0, 30.0]);
        assert_eq!(scale.domain(), (10.0, 50.0));
        assert_eq!(scale.apply(10.0), Some(&"#f7fcf5"));
        assert_eq!(scale.apply(30.0), Some(&"#74c476"));
        assert_eq!(scale.apply(50.0), Some(&"#00441b"));
        // out of domain clamps to the ends
        assert_eq!(scale.apply(-5.0), Some(&"#f7fcf5"));
        assert_eq!(scale.apply(500.0), Some(&"#00441b"));
        assert_eq!(scale.apply(f64::NAN), None);
    }

    #[test]
    fn boundary_value_falls_in_upper_bin() {
        let scale = QuantizeScale::new((0.0, 3.0), vec!['a', 'b', 'c']);
        assert_eq!(scale.apply(1.0), Some(&'b'));
        assert_eq!(scale.apply(0.999), Some(&'a'));
    }

    #[test]
    fn invert_extent_covers_domain_in_order() {
        let scale = color_scale([0.0, 90.0]);
        assert_eq!(scale.invert_extent(0), Some((0.0, 10.0)));
        assert_eq!(scale.invert_extent(8).map(|e| e.1), Some(90.0));
        assert_eq!(scale.invert_extent(9), None);
        for i in 0..8 {
            let (_, hi) = scale.invert_extent(i).unwrap();
            let (lo, _) = scale.invert_extent(i + 1).unwrap();
            assert_eq!(hi, lo);
        }
    }

    #[test]
    fn extent_ignores_nan_and_empty() {
        assert_eq!(extent([3.0, f64::NAN, -1.0, 7.5]), Some((-1.0, 7.5)));
        assert_eq!(extent(Vec::<f64>::new()), None);
        assert_eq!(color_scale(Vec::new()).domain(), (0.0, 0.0));
    }

    #[test]
    fn linear_scale_interpolates() {
        let scale = LinearScale::new((10.0, 50.0), (0.0, 200.0));
        assert_eq!(scale.apply(10.0), 0.0);
        assert_eq!(scale.apply(30.0), 100.0);
        assert_eq!(scale.apply(50.0), 200.0);
        assert_eq!(LinearScale::new((5.0, 5.0), (0.0, 200.0)).apply(5.0), 100.0);
    }
}
