use serde::Serialize;
use signalnode::math::{classify, predict, sma_features, FEATURE_COUNT};

#[derive(Serialize)]
struct SignalCase {
    prices_newest_first: Vec<f32>,
    periods: [u32; FEATURE_COUNT],
    weights: [f32; FEATURE_COUNT],
    bias: f32,
    features: [f32; FEATURE_COUNT],
    raw_score: f32,
    confidence: f32,
    prediction: u8,
}

#[derive(Serialize)]
struct Golden {
    sol_usd_feed_id_hex: String,
    usdc_usd_feed_id_hex: String,
    cases: Vec<SignalCase>,
}

fn feed_hex(feed: &str) -> String {
    let raw = hex::decode(feed.trim_start_matches("0x")).unwrap();
    assert_eq!(raw.len(), 32, "feed id must be 32 bytes");
    hex::encode(raw)
}

fn main() {
    // Define a few canonical cases
    let inputs: Vec<(Vec<f32>, [u32; 5], [f32; 5], f32)> = vec![
        (
            vec![150.0; 8],
            [1, 2, 4, 6, 8],
            [0.2, -0.1, 0.05, 0.0, 0.1],
            -0.5,
        ),
        (
            vec![101.0, 100.0, 99.0, 98.5, 98.0, 97.0],
            [1, 2, 3, 4, 5],
            [1.0, -1.0, 0.5, 0.25, 0.0],
            0.0,
        ),
        (
            vec![0.985, 0.99, 1.0, 1.01, 1.02],
            [1, 1, 2, 3, 5],
            [-2.0, 2.0, -1.0, 1.0, 0.5],
            0.1,
        ),
        (vec![42.0; 16], [16, 8, 4, 2, 1], [0.0; 5], 3.0),
    ];

    let mut cases = Vec::with_capacity(inputs.len());
    for (prices, periods, weights, bias) in inputs {
        let features =
            sma_features(&prices, &periods).expect("every case covers its longest period");
        let raw_score = predict(&weights, bias, &features);
        let (prediction, confidence) = classify(&weights, bias, &features);
        cases.push(SignalCase {
            prices_newest_first: prices,
            periods,
            weights,
            bias,
            features,
            raw_score,
            confidence,
            prediction,
        });
    }

    let golden = Golden {
        sol_usd_feed_id_hex: feed_hex(signalnode::SOL_USD_FEED_HEX),
        usdc_usd_feed_id_hex: feed_hex(signalnode::USDC_USD_FEED_HEX),
        cases,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&golden).expect("serialize golden vectors")
    );
}
