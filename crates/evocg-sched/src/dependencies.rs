//! Transitive instruction dependencies.

use std::collections::BTreeSet;

/// For every instruction, the sorted set of instructions it transitively
/// depends on. Instructions are dense indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    sets: Vec<Vec<usize>>,
}

impl Dependencies {
    /// Close the direct producer relation. `producers[i]` lists the
    /// instructions writing an operand of `i`; the relation must be acyclic.
    pub fn compute(producers: &[Vec<usize>]) -> Self {
        let mut sets: Vec<Option<Vec<usize>>> = vec![None; producers.len()];
        for i in 0..producers.len() {
            Self::visit(i, producers, &mut sets);
        }
        Self {
            sets: sets.into_iter().map(Option::unwrap_or_default).collect(),
        }
    }

    fn visit(i: usize, producers: &[Vec<usize>], sets: &mut Vec<Option<Vec<usize>>>) {
        if sets[i].is_some() {
            return;
        }
        let mut closure = BTreeSet::new();
        for &p in &producers[i] {
            Self::visit(p, producers, sets);
            closure.insert(p);
            if let Some(inherited) = &sets[p] {
                closure.extend(inherited.iter().copied());
            }
        }
        sets[i] = Some(closure.into_iter().collect());
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Instructions that must issue strictly before `instruction`.
    pub fn of(&self, instruction: usize) -> &[usize] {
        &self.sets[instruction]
    }

    pub fn depends_on(&self, instruction: usize, other: usize) -> bool {
        self.sets[instruction].binary_search(&other).is_ok()
    }

    /// Total number of (instruction, dependency) pairs.
    pub fn num_pairs(&self) -> usize {
        self.sets.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chain_is_closed() {
        // 0 <- 1 <- 2, and 3 reads 1 twice
        let deps = Dependencies::compute(&[vec![], vec![0], vec![1], vec![1, 1]]);
        assert_eq!(deps.of(2), &[0, 1]);
        assert_eq!(deps.of(3), &[0, 1]);
        assert!(deps.depends_on(2, 0));
        assert!(!deps.depends_on(0, 2));
        assert_eq!(deps.num_pairs(), 5);
    }

    #[test]
    fn test_diamond() {
        let deps = Dependencies::compute(&[vec![], vec![0], vec![0], vec![1, 2]]);
        assert_eq!(deps.of(3), &[0, 1, 2]);
        assert!(!deps.depends_on(1, 2));
    }

    fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..24).prop_flat_map(|n| {
            let rows: Vec<_> = (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(Vec::new()).boxed()
                    } else {
                        proptest::collection::vec(0..i, 0..3).boxed()
                    }
                })
                .collect();
            rows
        })
    }

    proptest! {
        #[test]
        fn test_dependencies_are_transitive(producers in dag()) {
            let deps = Dependencies::compute(&producers);
            for x in 0..producers.len() {
                for &y in deps.of(x) {
                    for &z in deps.of(y) {
                        prop_assert!(deps.depends_on(x, z));
                    }
                }
                for &p in &producers[x] {
                    prop_assert!(deps.depends_on(x, p));
                }
                prop_assert!(!deps.depends_on(x, x));
            }
        }
    }
}
