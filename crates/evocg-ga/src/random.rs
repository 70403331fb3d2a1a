//! Random helpers shared by the genetic operators.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Standard normal sample (Marsaglia polar method).
pub fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
    loop {
        let v1 = 2.0 * rng.gen::<f64>() - 1.0;
        let v2 = 2.0 * rng.gen::<f64>() - 1.0;
        let s = v1 * v1 + v2 * v2;
        if s > 0.0 && s < 1.0 {
            return v1 * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

/// How many of `n` items a mutation disturbs: at least one, usually few.
pub fn mutation_sample_size(rng: &mut ChaCha8Rng, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let g = gaussian(rng).abs();
    let k = (g * (n - 1) as f64 / 3.0 + 1.0) as usize;
    k.min(n)
}

/// How many of `n` items a crossover exchanges: centred on half of them.
pub fn crossover_sample_size(rng: &mut ChaCha8Rng, n: usize) -> usize {
    let g = gaussian(rng);
    let k = g * (n / 6) as f64 + (n / 2) as f64;
    if k <= 0.0 {
        0
    } else {
        (k as usize).min(n)
    }
}

/// Walk depth that reaches roughly `sample` operations in a binary tree.
pub fn sample_depth(sample: usize) -> usize {
    (sample.max(1) as f64).log2() as usize + 1
}
