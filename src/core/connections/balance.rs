//! Balance equations of static-rate dataflow networks.
//!
//! For every channel `q[writer] * produced == q[reader] * consumed` must hold
//! for a bounded infinite run. The repetition vector `q` is found per
//! connected component by propagating exact ratios from an arbitrary root.

use crate::core::connections::topology::ChannelBinding;
use crate::core::errors::{Result, SimError};
use std::collections::VecDeque;

/// Non-negative rational number, always normalized to lowest terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    num: u64,
    denom: u64,
}

impl Ratio {
    fn new(num: u64, denom: u64) -> Self {
        debug_assert!(denom > 0, "Denominator must be positive (got 0)");
        let g = gcd(num, denom).max(1);
        Ratio {
            num: num / g,
            denom: denom / g,
        }
    }

    fn one() -> Self {
        Ratio { num: 1, denom: 1 }
    }

    /// Product in lowest terms, `None` when a term leaves the `u64` range
    fn checked_mul(self, rhs: Ratio) -> Option<Ratio> {
        let g1 = gcd(self.num, rhs.denom).max(1);
        let g2 = gcd(rhs.num, self.denom).max(1);
        let num = (self.num / g1).checked_mul(rhs.num / g2)?;
        let denom = (self.denom / g2).checked_mul(rhs.denom / g1)?;
        Some(Ratio::new(num, denom))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

fn overflow(process_names: &[String], component: &[usize]) -> SimError {
    let members: Vec<&str> = component.iter().map(|&p| process_names[p].as_str()).collect();
    SimError::Topology(format!(
        "Repetition vector does not fit in 64 bits for processes: {}",
        members.join(", ")
    ))
}

/// Compute the smallest positive integer repetition vector.
///
/// Channels with a zero rate on either side carry no constraint. Processes
/// that are not connected to any constrained channel fire once per period.
pub fn repetition_vector(process_names: &[String], bindings: &[ChannelBinding]) -> Result<Vec<u64>> {
    let n = process_names.len();
    // adjacency: (neighbor, factor) with q[neighbor] = q[self] * factor
    let mut adjacency: Vec<Vec<(usize, Ratio)>> = vec![Vec::new(); n];
    for binding in bindings {
        let produced = binding.writer.rate as u64;
        let consumed = binding.reader.rate as u64;
        if produced == 0 || consumed == 0 {
            continue;
        }
        let (w, r) = (binding.writer.process, binding.reader.process);
        adjacency[w].push((r, Ratio::new(produced, consumed)));
        adjacency[r].push((w, Ratio::new(consumed, produced)));
    }

    let mut ratios: Vec<Option<Ratio>> = vec![None; n];
    for root in 0..n {
        if ratios[root].is_some() {
            continue;
        }
        let mut component = vec![root];
        ratios[root] = Some(Ratio::one());
        let mut queue = VecDeque::from([root]);

        while let Some(node) = queue.pop_front() {
            let here = ratios[node].unwrap_or_else(Ratio::one);
            for &(neighbor, factor) in &adjacency[node] {
                let expected = here
                    .checked_mul(factor)
                    .ok_or_else(|| overflow(process_names, &component))?;
                match ratios[neighbor] {
                    None => {
                        ratios[neighbor] = Some(expected);
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                    Some(found) if found != expected => {
                        return Err(SimError::Topology(format!(
                            "Inconsistent token rates between '{}' and '{}': balance equations have no solution",
                            process_names[node], process_names[neighbor]
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        // scale the component to the smallest integer solution
        let scale = component
            .iter()
            .filter_map(|&p| ratios[p])
            .try_fold(1, |acc, r| lcm(acc, r.denom))
            .ok_or_else(|| overflow(process_names, &component))?;
        let mut integers: Vec<u64> = component
            .iter()
            .filter_map(|&p| ratios[p])
            .map(|r| r.num.checked_mul(scale / r.denom))
            .collect::<Option<_>>()
            .ok_or_else(|| overflow(process_names, &component))?;
        let common = integers.iter().copied().fold(0, gcd).max(1);
        for value in integers.iter_mut() {
            *value /= common;
        }
        for (&p, value) in component.iter().zip(integers) {
            ratios[p] = Some(Ratio::new(value, 1));
        }
    }

    Ok(ratios
        .into_iter()
        .map(|r| r.map_or(1, |r| r.num))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connections::topology::Endpoint;
    use crate::core::types::ChannelId;

    fn binding(id: usize, writer: (usize, usize), reader: (usize, usize)) -> ChannelBinding {
        ChannelBinding {
            channel: ChannelId(id),
            name: format!("s{}", id),
            writer: Endpoint {
                process: writer.0,
                port: "o".to_string(),
                rate: writer.1,
            },
            reader: Endpoint {
                process: reader.0,
                port: "i".to_string(),
                rate: reader.1,
            },
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_ratio_normalization() {
        assert_eq!(Ratio::new(2, 4), Ratio::new(1, 2));
        assert_eq!(Ratio::new(2, 3).checked_mul(Ratio::new(3, 2)), Some(Ratio::one()));
        assert_eq!(Ratio::new(u64::MAX, 1).checked_mul(Ratio::new(1, u64::MAX)), Some(Ratio::one()));
        assert_eq!(Ratio::new(u64::MAX, 1).checked_mul(Ratio::new(2, 1)), None);
    }

    #[test]
    fn test_two_to_one_chain() {
        // p0 produces 1, p1 consumes 2 produces 1, p2 consumes 1
        let bindings = vec![binding(0, (0, 1), (1, 2)), binding(1, (1, 1), (2, 1))];
        let q = repetition_vector(&names(3), &bindings).unwrap();
        assert_eq!(q, vec![2, 1, 1]);
    }

    #[test]
    fn test_consistent_cycle() {
        // p0 -(2:3)-> p1 -(3:2)-> p0
        let bindings = vec![binding(0, (0, 2), (1, 3)), binding(1, (1, 3), (0, 2))];
        let q = repetition_vector(&names(2), &bindings).unwrap();
        assert_eq!(q, vec![3, 2]);
    }

    #[test]
    fn test_inconsistent_rates() {
        // p0 -(1:1)-> p1, p0 -(2:1)-> p2, p1 -(1:1)-> p2
        let bindings = vec![
            binding(0, (0, 1), (1, 1)),
            binding(1, (0, 2), (2, 1)),
            binding(2, (1, 1), (2, 1)),
        ];
        let err = repetition_vector(&names(3), &bindings).unwrap_err();
        assert!(err.to_string().contains("Inconsistent token rates"));
    }

    #[test]
    fn test_extreme_rates_overflow_is_topology_error() {
        // p0 -(1:2^32)-> p1 -(1:2^32)-> p2 would need p0 to fire 2^64 times
        let big = 1usize << 32;
        let bindings = vec![binding(0, (0, 1), (1, big)), binding(1, (1, 1), (2, big))];
        let err = repetition_vector(&names(3), &bindings).unwrap_err();
        assert!(matches!(err, SimError::Topology(_)));
        assert!(err.to_string().contains("does not fit in 64 bits"), "{}", err);
    }

    #[test]
    fn test_disconnected_processes() {
        let q = repetition_vector(&names(2), &[]).unwrap();
        assert_eq!(q, vec![1, 1]);
    }
}
