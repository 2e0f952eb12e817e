// SPDX-License-Identifier: MIT
use anchor_lang::prelude::*;
use pyth_solana_receiver_sdk::price_update::{get_feed_id_from_hex, PriceUpdateV2};

use crate::NodeError;

/// One decoded oracle sample, scaled to a plain decimal price.
pub struct OraclePrice {
    pub price: f64,
    pub conf: f64,
    pub publish_time: i64,
}

/// Decode the sample a `PriceUpdateV2` account holds for `feed_id_hex`.
/// Staleness and confidence are judged by the caller; this only scales the
/// fixed-point fields.
pub fn read_feed(update: &PriceUpdateV2, feed_id_hex: &str) -> Result<OraclePrice> {
    let feed_id =
        get_feed_id_from_hex(feed_id_hex).map_err(|_| error!(NodeError::InvalidFeedId))?;
    let sample = update
        .get_price_unchecked(&feed_id)
        .map_err(|_| error!(NodeError::PriceFeedNotFound))?;

    let scale = 10f64.powi(sample.exponent);
    Ok(OraclePrice {
        price: sample.price as f64 * scale,
        conf: sample.conf as f64 * scale,
        publish_time: sample.publish_time,
    })
}

/// Base/quote midprice. Falls back to the base price if the quote is unusable.
pub fn pair_midprice(base_price: f64, quote_price: f64) -> f32 {
    if quote_price != 0.0 {
        (base_price / quote_price) as f32
    } else {
        base_price as f32
    }
}
