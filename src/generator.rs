//! Random test instance generation

use std::collections::HashSet;

use rand::prelude::*;

/// Produce `list_size` distinct integers drawn uniformly from
/// `1..=list_size*10`, in the order they were drawn.
pub fn random_sequence(list_size: u32) -> Vec<i32> {
    let mut rng = rand::rng();
    let span = list_size as i32 * 10;
    let mut seen = HashSet::with_capacity(list_size as usize);
    let mut numbers = Vec::with_capacity(list_size as usize);
    while numbers.len() < list_size as usize {
        let n = rng.random_range(1..=span);
        if seen.insert(n) {
            numbers.push(n);
        }
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_count_of_distinct_values() {
        let numbers = random_sequence(100);
        assert_eq!(numbers.len(), 100);
        let unique: HashSet<i32> = numbers.iter().copied().collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn values_stay_in_range() {
        for &n in &random_sequence(50) {
            assert!((1..=500).contains(&n));
        }
    }

    #[test]
    fn single_element_instance() {
        let numbers = random_sequence(1);
        assert_eq!(numbers.len(), 1);
        assert!((1..=10).contains(&numbers[0]));
    }
}
