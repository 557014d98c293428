//! Score normalization per serving mode.

use crate::decoding::Mode;
use crate::scorer::ScoreSequence;

/// Convert raw step scores into response vectors.
///
/// Generative mode applies softmax to each step independently; single-pass
/// mode returns the raw scores untouched.
pub fn normalize(scores: ScoreSequence, mode: Mode) -> Vec<Vec<f32>> {
    match mode {
        Mode::Generative => scores
            .into_inner()
            .into_iter()
            .map(|mut step| {
                softmax_inplace(&mut step);
                step
            })
            .collect(),
        Mode::SinglePass => scores.into_inner(),
    }
}

/// Numerically stable softmax over one score vector.
///
/// Accumulates in f64 so large vocabularies still sum to 1. An all −∞
/// vector becomes uniform; +∞ entries split the mass evenly. NaN entries
/// get probability 0.
pub fn softmax_inplace(scores: &mut [f32]) {
    if scores.is_empty() {
        return;
    }

    let max = scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);

    if max == f32::INFINITY || max == f32::NEG_INFINITY {
        let hits = |s: f32| !s.is_nan() && s == max;
        let count = scores.iter().filter(|&&s| hits(s)).count().max(1);
        let share = 1.0 / count as f32;
        for s in scores.iter_mut() {
            *s = if hits(*s) { share } else { 0.0 };
        }
        return;
    }

    let mut sum = 0.0f64;
    for s in scores.iter_mut() {
        let e = if s.is_nan() {
            0.0
        } else {
            ((*s - max) as f64).exp()
        };
        *s = e as f32;
        sum += e;
    }

    // sum ≥ 1 because the max element contributes exp(0).
    let scale = 1.0 / sum;
    for s in scores.iter_mut() {
        *s = (*s as f64 * scale) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_distribution(v: &[f32]) {
        let sum: f64 = v.iter().map(|&p| p as f64).sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum = {sum}");
        assert!(v.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn generative_rows_are_distributions() {
        let seq = ScoreSequence::from(vec![
            vec![1.0, 2.0, 3.0],
            vec![-1000.0, 0.0, 1000.0],
            vec![0.0, 0.0, 0.0],
        ]);
        let out = normalize(seq, Mode::Generative);
        assert_eq!(out.len(), 3);
        for row in &out {
            assert_distribution(row);
        }
        assert!((out[2][0] - 1.0 / 3.0).abs() < 1e-6);
        assert!(out[0][2] > out[0][1] && out[0][1] > out[0][0]);
    }

    #[test]
    fn large_vocabulary_sums_to_one() {
        let mut row: Vec<f32> = (0..50_000).map(|i| ((i * 7919) % 97) as f32 * 0.05).collect();
        softmax_inplace(&mut row);
        assert_distribution(&row);
    }

    #[test]
    fn steps_are_normalized_independently() {
        let a = vec![0.5, -0.5, 2.0];
        let b = vec![10.0, 10.0, -3.0];
        let together = normalize(ScoreSequence::from(vec![a.clone(), b.clone()]), Mode::Generative);
        let alone = normalize(ScoreSequence::from(vec![b]), Mode::Generative);
        assert_eq!(together[1], alone[0]);
    }

    #[test]
    fn single_pass_is_raw() {
        let raw = vec![vec![3.5, -1.25, 0.0]];
        let out = normalize(ScoreSequence::from(raw.clone()), Mode::SinglePass);
        assert_eq!(out, raw);
    }

    #[test]
    fn infinities_and_nan() {
        let mut masked = vec![f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY];
        softmax_inplace(&mut masked);
        assert_eq!(masked, vec![0.0, 1.0, 0.0]);

        let mut all_masked = vec![f32::NEG_INFINITY; 4];
        softmax_inplace(&mut all_masked);
        assert_eq!(all_masked, vec![0.25; 4]);

        let mut pos_inf = vec![f32::INFINITY, 1.0, f32::INFINITY];
        softmax_inplace(&mut pos_inf);
        assert_eq!(pos_inf, vec![0.5, 0.0, 0.5]);

        let mut with_nan = vec![f32::NAN, 0.0, 0.0];
        softmax_inplace(&mut with_nan);
        assert_distribution(&with_nan);
        assert_eq!(with_nan[0], 0.0);
    }
}
