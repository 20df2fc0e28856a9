//! Alias tables for O(1) categorical draws.
//!
//! Walker (1974) / Vose (1991): O(k) setup, two uniform draws per sample.

use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    prob: Vec<f32>,
    alias: Vec<u32>,
}

impl AliasTable {
    /// Build from non-negative (not necessarily normalized) weights.
    ///
    /// All-zero or empty input yields an empty table.
    pub fn new(weights: &[f32]) -> Self {
        let k = weights.len();
        let sum: f64 = weights.iter().map(|&w| w as f64).sum();
        if k == 0 || !(sum > 0.0) {
            return Self::default();
        }

        let mut prob = vec![0.0f32; k];
        let mut alias = vec![0u32; k];
        let mut scaled: Vec<f64> = weights.iter().map(|&w| w as f64 * k as f64 / sum).collect();

        let mut smaller: Vec<usize> = Vec::with_capacity(k);
        let mut larger: Vec<usize> = Vec::with_capacity(k);
        for (i, &s) in scaled.iter().enumerate() {
            if s < 1.0 {
                smaller.push(i);
            } else {
                larger.push(i);
            }
        }

        while !smaller.is_empty() && !larger.is_empty() {
            let (Some(small), Some(large)) = (smaller.pop(), larger.pop()) else {
                break;
            };
            prob[small] = scaled[small] as f32;
            alias[small] = large as u32;
            scaled[large] = scaled[large] + scaled[small] - 1.0;
            if scaled[large] < 1.0 {
                smaller.push(large);
            } else {
                larger.push(large);
            }
        }

        // Leftovers are 1 up to rounding error.
        for i in larger.into_iter().chain(smaller) {
            prob[i] = 1.0;
            alias[i] = i as u32;
        }

        Self { prob, alias }
    }

    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draw an index. Returns `None` for an empty table.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let k = self.prob.len();
        if k == 0 {
            return None;
        }
        let i = rng.random_range(0..k);
        if rng.random::<f32>() < self.prob[i] {
            Some(i)
        } else {
            Some(self.alias[i] as usize)
        }
    }

    /// The distribution the table encodes, reconstructed from its columns.
    pub fn probabilities(&self) -> Vec<f32> {
        let k = self.prob.len();
        let mut out = vec![0.0f32; k];
        if k == 0 {
            return out;
        }
        let col = 1.0 / k as f32;
        for i in 0..k {
            out[i] += self.prob[i] * col;
            out[self.alias[i] as usize] += (1.0 - self.prob[i]) * col;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_close_f32(a: f32, b: f32, eps: f32) {
        assert!(
            (a - b).abs() <= eps,
            "expected |{a} - {b}| <= {eps}, got {}",
            (a - b).abs()
        );
    }

    #[test]
    fn columns_match_expected_for_two_outcomes() {
        // [2.0, 0.5] normalizes to [0.8, 0.2].
        let t = AliasTable::new(&[2.0, 0.5]);
        assert_eq!(t.alias, vec![0, 0]);
        assert_close_f32(t.prob[0], 1.0, 1e-6);
        assert_close_f32(t.prob[1], 0.4, 1e-6);

        let p = t.probabilities();
        assert_close_f32(p[0], 0.8, 1e-6);
        assert_close_f32(p[1], 0.2, 1e-6);
    }

    #[test]
    fn empty_and_degenerate_inputs() {
        assert!(AliasTable::new(&[]).is_empty());
        assert!(AliasTable::new(&[0.0, 0.0]).is_empty());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(AliasTable::new(&[]).sample(&mut rng), None);

        let single = AliasTable::new(&[3.0]);
        assert_eq!(single.sample(&mut rng), Some(0));

        // A zero-weight outcome is never drawn.
        let t = AliasTable::new(&[0.0, 1.0]);
        for _ in 0..1000 {
            assert_eq!(t.sample(&mut rng), Some(1));
        }
    }

    #[test]
    fn reconstructed_distribution_sums_to_one() {
        let t = AliasTable::new(&[0.3, 7.0, 1.0, 0.01, 2.2]);
        let s: f32 = t.probabilities().iter().sum();
        assert_close_f32(s, 1.0, 1e-6);
    }

    #[test]
    fn draw_distribution_smoke() {
        // Deterministic chi-squared smoke test: catches egregious alias bugs
        // without being overly sensitive/flaky.
        let probs = [0.1f32, 0.2, 0.7];
        let t = AliasTable::new(&probs);

        let trials = 20_000usize;
        let mut counts = [0usize; 3];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..trials {
            counts[t.sample(&mut rng).unwrap()] += 1;
        }

        let chi2: f64 = counts
            .iter()
            .zip(probs.iter())
            .map(|(&c, &p)| {
                let e = trials as f64 * p as f64;
                let diff = c as f64 - e;
                (diff * diff) / e
            })
            .sum();

        // df = 2; E[chi2] ~ 2, Var ~ 4. Use a very conservative cutoff.
        assert!(chi2 < 50.0, "chi2 too large (chi2={chi2:.2}). counts={counts:?}");
    }
}
