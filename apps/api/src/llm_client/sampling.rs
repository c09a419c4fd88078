//! Next-token selection over a logits row.
//!
//! `temperature` rescales logits before softmax; `do_sample = false` falls back to greedy
//! argmax so generations are reproducible.

use rand::Rng;

/// Picks the next token id from `logits`.
pub fn next_token<R: Rng + ?Sized>(
    logits: &[f32],
    temperature: f32,
    do_sample: bool,
    rng: &mut R,
) -> Option<usize> {
    if logits.is_empty() {
        return None;
    }
    if !do_sample || temperature <= 0.0 {
        return argmax(logits);
    }

    let probs = softmax(logits, temperature);
    let draw: f32 = rng.gen();

    let mut cumulative = 0.0f32;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if draw < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave the cumulative sum just under 1.0.
    argmax(&probs)
}

/// Temperature-scaled softmax, stabilised by subtracting the max logit.
pub fn softmax(logits: &[f32], temperature: f32) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits
        .iter()
        .map(|&l| ((l - max) / temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
