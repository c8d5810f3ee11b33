//! Jain fairness index across competing flows.

/// Jain index over per-flow average throughputs.
///
/// Defined only when exactly two throughputs are known; any other
/// cardinality returns `None` rather than a number with the wrong
/// semantics. A zero throughput is a valid measurement and participates.
pub fn jain_fairness(throughputs: &[Option<f64>]) -> Option<f64> {
    let valid: Vec<f64> = throughputs.iter().copied().flatten().collect();
    if valid.len() != 2 {
        return None;
    }
    let sum: f64 = valid.iter().sum();
    let sum_squares: f64 = valid.iter().map(|t| t * t).sum();
    if sum_squares == 0.0 {
        return None;
    }
    Some(sum * sum / (2.0 * sum_squares))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_throughputs_are_perfectly_fair() {
        assert_eq!(jain_fairness(&[Some(5.0e6), Some(5.0e6)]), Some(1.0));
    }

    #[test]
    fn test_starved_flow_halves_the_index() {
        assert_eq!(jain_fairness(&[Some(8.0e6), Some(0.0)]), Some(0.5));
    }

    #[test]
    fn test_unequal_flows() {
        let index = jain_fairness(&[Some(15.0e6), Some(5.0e6)]).unwrap();
        assert!((index - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_cardinality_is_undefined() {
        assert_eq!(jain_fairness(&[]), None);
        assert_eq!(jain_fairness(&[Some(5.0e6)]), None);
        assert_eq!(jain_fairness(&[Some(1.0), Some(2.0), Some(3.0)]), None);
        assert_eq!(jain_fairness(&[Some(5.0e6), None]), None);
    }

    #[test]
    fn test_nulls_are_filtered_before_counting() {
        assert_eq!(
            jain_fairness(&[Some(5.0e6), None, Some(5.0e6)]),
            Some(1.0)
        );
    }

    #[test]
    fn test_both_zero_is_undefined() {
        assert_eq!(jain_fairness(&[Some(0.0), Some(0.0)]), None);
    }
}
