/// Cumulative start offsets of a proportional array: `[0, a0, a0+a1, ...]`
/// with one entry per element.
pub fn starts(durs: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    durs.iter()
        .map(|d| {
            let start = acc;
            acc += d;
            start
        })
        .collect()
}

/// Cumulative end offsets of a proportional array.
pub fn ends(durs: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    durs.iter()
        .map(|d| {
            acc += d;
            acc
        })
        .collect()
}

pub fn close_to(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Round to five decimal places, the precision at which time points are
/// compared across phrase boundaries.
pub fn round5(x: f64) -> f64 {
    (x * 1e5).round() / 1e5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_and_ends() {
        assert_eq!(starts(&[0.25, 0.25, 0.5]), vec![0.0, 0.25, 0.5]);
        assert_eq!(ends(&[0.25, 0.25, 0.5]), vec![0.25, 0.5, 1.0]);
        assert!(starts(&[]).is_empty());
    }

    #[test]
    fn test_round5() {
        assert_eq!(round5(1.000004), 1.0);
        assert!(close_to(0.1 + 0.2, 0.3));
    }
}
