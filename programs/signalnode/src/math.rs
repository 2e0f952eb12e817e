// SPDX-License-Identifier: MIT

/// Width of the feature vector and of the parameter arrays.
pub const FEATURE_COUNT: usize = 5;

/// Simple moving average over the first `period` samples. Callers pass
/// prices newest first, so the window covers the most recent observations.
/// Returns `None` when there are not enough samples.
pub fn sma(prices: &[f32], period: u32) -> Option<f32> {
    let window = period as usize;
    if window == 0 || prices.len() < window {
        return None;
    }
    let sum: f32 = prices[..window].iter().sum();
    Some(sum / period as f32)
}

/// One SMA per configured period. `None` if any period lacks samples.
pub fn sma_features(
    prices: &[f32],
    periods: &[u32; FEATURE_COUNT],
) -> Option<[f32; FEATURE_COUNT]> {
    let mut out = [0.0; FEATURE_COUNT];
    for (slot, &period) in out.iter_mut().zip(periods.iter()) {
        *slot = sma(prices, period)?;
    }
    Some(out)
}

pub fn sigmoid(x: f32) -> f32 {
    (1.0 / (1.0 + libm::exp(-(x as f64)))) as f32
}

/// Linear score `w . f + b`.
pub fn predict(
    weights: &[f32; FEATURE_COUNT],
    bias: f32,
    features: &[f32; FEATURE_COUNT],
) -> f32 {
    let mut score = bias;
    for (weight, feature) in weights.iter().zip(features.iter()) {
        score += weight * feature;
    }
    score
}

/// Logistic classification at the 0.5 threshold. Returns the class and the
/// sigmoid probability.
pub fn classify(
    weights: &[f32; FEATURE_COUNT],
    bias: f32,
    features: &[f32; FEATURE_COUNT],
) -> (u8, f32) {
    let probability = sigmoid(predict(weights, bias, features));
    let class = if probability > 0.5 { 1 } else { 0 };
    (class, probability)
}
