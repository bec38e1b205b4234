/// Converts a frequency in Hz to the Bark scale (Traunmüller, with the low
/// and high end corrections). Callers must filter out non-positive input.
pub fn bark_transform(hz: f64) -> f64 {
    let bark = (26.81 * hz) / (1960.0 + hz) - 0.53;
    if bark < 2.0 {
        bark + 0.15 * (2.0 - bark)
    } else {
        bark + 0.22 * (bark - 20.1)
    }
}

#[cfg(test)]
mod tests {
    use super::bark_transform;
    use approx::assert_relative_eq;

    #[test]
    fn zero_hz_takes_low_correction() {
        // raw value is -0.53, then the < 2 Bark branch applies
        assert_relative_eq!(bark_transform(0.0), -0.53 + 0.15 * 2.53, epsilon = 1e-12);
    }

    #[test]
    fn high_branch_matches_formula() {
        let raw = 26.81 * 1000.0 / 2960.0 - 0.53;
        assert_relative_eq!(bark_transform(1000.0), raw + 0.22 * (raw - 20.1), epsilon = 1e-12);
    }

    fn assert_increasing(from: f64, to: f64) {
        let mut previous = bark_transform(from);
        let mut hz = from + 5.0;
        while hz <= to {
            let current = bark_transform(hz);
            assert!(current > previous, "not increasing at {hz} Hz");
            previous = current;
            hz += 5.0;
        }
    }

    #[test]
    fn monotonic_within_each_correction_branch() {
        // the corrections switch at 2 Bark (roughly 200 Hz)
        assert_increasing(20.0, 190.0);
        assert_increasing(210.0, 20_000.0);
    }

    #[test]
    fn bounded_asymptote() {
        let limit = 26.81 - 0.53;
        let corrected = limit + 0.22 * (limit - 20.1);
        assert!(bark_transform(1.0e9) < corrected);
        assert_relative_eq!(bark_transform(1.0e9), corrected, epsilon = 1e-3);
    }
}
