// SPDX-License-Identifier: MIT
#![allow(unexpected_cfgs)]
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
use anchor_lang::prelude::*;
use pyth_solana_receiver_sdk::price_update::PriceUpdateV2;

pub mod math;
pub mod oracle;

pub use math::FEATURE_COUNT;

declare_id!("AJ33fSGrj6xhvNT8DnBvRAPgVzpKs8SMDDb1cMus6SMi");

/// Pyth feed ids for the tracked pair.
pub const SOL_USD_FEED_HEX: &str =
    "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d";
pub const USDC_USD_FEED_HEX: &str =
    "0xeaa020c61cc479712813461ce153894a96a6c00b21ed0cfc2798d1f9a9e9c94a";

/// Oracle samples older than this are rejected.
pub const MAX_PRICE_AGE_SECS: i64 = 300;
/// Confidence interval cap, as a fraction of the price.
pub const MAX_CONF_RATIO: f64 = 0.02;
/// Ring-buffer depth of the price history.
pub const PRICE_CAPACITY: usize = 16;

#[program]
pub mod signalnode {
    use super::*;

    /// Create the per-authority node state marker. One-shot: a second call
    /// against the same address fails at the system level.
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        let state = &mut ctx.accounts.node_state;
        state.authority = ctx.accounts.authority.key();
        state.created_at = Clock::get()?.unix_timestamp;
        state.bump = ctx.bumps.node_state;
        emit!(NodeInitialized {
            authority: state.authority,
            created_at: state.created_at,
        });
        msg!("node state initialized");
        Ok(())
    }

    /// Create the linear-model parameters account.
    pub fn initialize_params(
        ctx: Context<InitializeParams>,
        weights: [f32; FEATURE_COUNT],
        bias: f32,
    ) -> Result<()> {
        let params = &mut ctx.accounts.node_params;
        params.authority = ctx.accounts.authority.key();
        params.last_update = Clock::get()?.unix_timestamp;
        params.weights = weights;
        params.bias = bias;
        params.is_active = true;
        params.bump = ctx.bumps.node_params;
        emit!(ParamsInitialized {
            authority: params.authority,
            weights,
            bias,
        });
        msg!("model parameters initialized");
        Ok(())
    }

    /// Create the features account with the moving-average periods to track.
    pub fn initialize_features(
        ctx: Context<InitializeFeatures>,
        periods: [u32; FEATURE_COUNT],
    ) -> Result<()> {
        validate_periods(&periods)?;
        let features = &mut ctx.accounts.node_features;
        features.authority = ctx.accounts.authority.key();
        features.last_update = Clock::get()?.unix_timestamp;
        features.price_periods = periods;
        features.computed_features = [0.0; FEATURE_COUNT];
        features.bump = ctx.bumps.node_features;
        emit!(FeaturesConfigured {
            authority: features.authority,
            price_periods: periods,
        });
        msg!("features account initialized");
        Ok(())
    }

    /// Create the empty price-history ring buffer.
    pub fn initialize_price_history(ctx: Context<InitializePriceHistory>) -> Result<()> {
        let history = &mut ctx.accounts.price_history;
        history.authority = ctx.accounts.authority.key();
        history.last_updated = 0;
        history.current_index = 0;
        history.prices = [0.0; PRICE_CAPACITY];
        history.timestamps = [0; PRICE_CAPACITY];
        history.is_full = false;
        history.bump = ctx.bumps.price_history;
        msg!(
            "price history initialized with capacity for {} samples",
            PRICE_CAPACITY
        );
        Ok(())
    }

    /// Create the results account. Requires parameters to exist first.
    pub fn initialize_results(ctx: Context<InitializeResults>) -> Result<()> {
        let results = &mut ctx.accounts.node_results;
        results.authority = ctx.accounts.authority.key();
        results.last_update = Clock::get()?.unix_timestamp;
        results.latest_prediction = 0;
        results.confidence = 0.0;
        results.price_at_prediction = 0.0;
        results.predictions_count = 0;
        results.bump = ctx.bumps.node_results;
        msg!("results account initialized");
        Ok(())
    }

    /// Read the base and quote oracle feeds, validate both samples, and push
    /// the pair midprice into the ring buffer.
    pub fn record_price(ctx: Context<RecordPrice>) -> Result<()> {
        let history = &mut ctx.accounts.price_history;
        let now = Clock::get()?.unix_timestamp;

        let base = oracle::read_feed(&ctx.accounts.base_price_update, SOL_USD_FEED_HEX)?;
        let quote = oracle::read_feed(&ctx.accounts.quote_price_update, USDC_USD_FEED_HEX)?;
        for sample in [&base, &quote] {
            require!(sample.price > 0.0, NodeError::InvalidPrice);
            require!(
                now.saturating_sub(sample.publish_time) <= MAX_PRICE_AGE_SECS,
                NodeError::StalePrice
            );
            require!(
                sample.conf <= sample.price * MAX_CONF_RATIO,
                NodeError::LowPriceConfidence
            );
        }

        let midprice = oracle::pair_midprice(base.price, quote.price);
        history.push(midprice, base.publish_time);
        emit!(PriceRecorded {
            authority: ctx.accounts.authority.key(),
            price: midprice,
            publish_time: base.publish_time,
            samples: history.available() as u16,
        });
        msg!(
            "price stored: SOL/USDC = {:.6}, SOL/USD = {:.2}, USDC/USD = {:.4}",
            midprice,
            base.price,
            quote.price
        );
        Ok(())
    }

    /// Compute one simple moving average per configured period over the most
    /// recent window of the ring buffer.
    pub fn compute_features(ctx: Context<ComputeFeatures>) -> Result<()> {
        let features = &mut ctx.accounts.node_features;
        let history = &ctx.accounts.price_history;

        let max_period = features.price_periods.iter().copied().max().unwrap_or(1);
        require!(
            history.available() >= max_period as usize,
            NodeError::InsufficientPriceHistory
        );

        let recent = history.recent(max_period as usize);
        let computed = math::sma_features(&recent, &features.price_periods)
            .ok_or_else(|| error!(NodeError::InsufficientPriceHistory))?;

        features.computed_features = computed;
        features.last_update = Clock::get()?.unix_timestamp;
        emit!(FeaturesComputed {
            authority: ctx.accounts.authority.key(),
            features: computed,
        });
        msg!(
            "features = [{:.6}, {:.6}, {:.6}, {:.6}, {:.6}]",
            computed[0],
            computed[1],
            computed[2],
            computed[3],
            computed[4]
        );
        Ok(())
    }

    /// Classify the current features with the stored parameters and record
    /// the outcome.
    pub fn run_inference(ctx: Context<RunInference>) -> Result<()> {
        let params = &ctx.accounts.node_params;
        let features = &ctx.accounts.node_features;
        let history = &ctx.accounts.price_history;
        let results = &mut ctx.accounts.node_results;

        require!(params.is_active, NodeError::IndicatorInactive);
        let latest = history
            .latest()
            .ok_or_else(|| error!(NodeError::InsufficientPriceHistory))?;

        let (prediction, confidence) =
            math::classify(&params.weights, params.bias, &features.computed_features);
        let now = Clock::get()?.unix_timestamp;
        results.record(prediction, confidence, latest, now);

        emit!(PredictionMade {
            authority: ctx.accounts.authority.key(),
            prediction,
            confidence,
            price: latest,
        });
        let direction = if prediction == 1 { "UP" } else { "DOWN" };
        msg!(
            "prediction: {} (confidence {:.3}) at price {:.6}",
            direction,
            confidence,
            latest
        );
        Ok(())
    }

    /// Authority-only activation toggle for the indicator.
    pub fn set_active(ctx: Context<SetActive>, active: bool) -> Result<()> {
        let params = &mut ctx.accounts.node_params;
        require_keys_eq!(
            params.authority,
            ctx.accounts.authority.key(),
            NodeError::Unauthorized
        );
        params.is_active = active;
        params.last_update = Clock::get()?.unix_timestamp;
        emit!(ActiveToggled {
            authority: params.authority,
            active,
        });
        Ok(())
    }
}

// ------------ Accounts ------------

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = authority,
        space = NodeState::LEN,
        seeds = [b"node_state", authority.key().as_ref()],
        bump
    )]
    pub node_state: Account<'info, NodeState>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeParams<'info> {
    #[account(
        init,
        payer = authority,
        space = NodeParams::LEN,
        seeds = [b"node_params", authority.key().as_ref()],
        bump
    )]
    pub node_params: Account<'info, NodeParams>,

    #[account(
        seeds = [b"node_state", authority.key().as_ref()],
        bump = node_state.bump
    )]
    pub node_state: Account<'info, NodeState>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeFeatures<'info> {
    #[account(
        init,
        payer = authority,
        space = NodeFeatures::LEN,
        seeds = [b"node_features", authority.key().as_ref()],
        bump
    )]
    pub node_features: Account<'info, NodeFeatures>,

    #[account(
        seeds = [b"node_state", authority.key().as_ref()],
        bump = node_state.bump
    )]
    pub node_state: Account<'info, NodeState>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializePriceHistory<'info> {
    #[account(
        init,
        payer = authority,
        space = PriceHistory::LEN,
        seeds = [b"price_history", authority.key().as_ref()],
        bump
    )]
    pub price_history: Account<'info, PriceHistory>,

    #[account(
        seeds = [b"node_state", authority.key().as_ref()],
        bump = node_state.bump
    )]
    pub node_state: Account<'info, NodeState>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeResults<'info> {
    #[account(
        init,
        payer = authority,
        space = NodeResults::LEN,
        seeds = [b"node_results", authority.key().as_ref()],
        bump
    )]
    pub node_results: Account<'info, NodeResults>,

    #[account(
        seeds = [b"node_params", authority.key().as_ref()],
        bump = node_params.bump
    )]
    pub node_params: Account<'info, NodeParams>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct RecordPrice<'info> {
    #[account(
        mut,
        seeds = [b"price_history", authority.key().as_ref()],
        bump = price_history.bump
    )]
    pub price_history: Account<'info, PriceHistory>,

    pub base_price_update: Account<'info, PriceUpdateV2>,
    pub quote_price_update: Account<'info, PriceUpdateV2>,

    #[account(mut)]
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct ComputeFeatures<'info> {
    #[account(
        mut,
        seeds = [b"node_features", authority.key().as_ref()],
        bump = node_features.bump
    )]
    pub node_features: Account<'info, NodeFeatures>,

    #[account(
        seeds = [b"price_history", authority.key().as_ref()],
        bump = price_history.bump
    )]
    pub price_history: Account<'info, PriceHistory>,

    #[account(mut)]
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct RunInference<'info> {
    #[account(
        seeds = [b"node_params", authority.key().as_ref()],
        bump = node_params.bump
    )]
    pub node_params: Account<'info, NodeParams>,

    #[account(
        seeds = [b"node_features", authority.key().as_ref()],
        bump = node_features.bump
    )]
    pub node_features: Account<'info, NodeFeatures>,

    #[account(
        seeds = [b"price_history", authority.key().as_ref()],
        bump = price_history.bump
    )]
    pub price_history: Account<'info, PriceHistory>,

    #[account(
        mut,
        seeds = [b"node_results", authority.key().as_ref()],
        bump = node_results.bump
    )]
    pub node_results: Account<'info, NodeResults>,

    #[account(mut)]
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetActive<'info> {
    #[account(
        mut,
        seeds = [b"node_params", authority.key().as_ref()],
        bump = node_params.bump
    )]
    pub node_params: Account<'info, NodeParams>,

    #[account(mut)]
    pub authority: Signer<'info>,
}

// ------------ State ------------

/// Existence/ownership marker created exactly once per authority.
#[account]
pub struct NodeState {
    pub authority: Pubkey,
    pub created_at: i64,
    pub bump: u8,
}

impl NodeState {
    pub const LEN: usize = 8 + // discriminator
        32 +                   // authority
        8 +                    // created_at
        1; // bump
}

/// Linear-model parameters.
#[account]
pub struct NodeParams {
    pub authority: Pubkey,
    pub last_update: i64,
    pub weights: [f32; FEATURE_COUNT],
    pub bias: f32,
    pub is_active: bool,
    pub bump: u8,
}

impl NodeParams {
    pub const LEN: usize = 8 + // discriminator
        32 +                   // authority
        8 +                    // last_update
        4 * FEATURE_COUNT + // weights
        4 +                    // bias
        1 +                    // is_active
        1; // bump
}

/// Moving-average periods and the latest computed feature vector.
#[account]
pub struct NodeFeatures {
    pub authority: Pubkey,
    pub last_update: i64,
    pub price_periods: [u32; FEATURE_COUNT],
    pub computed_features: [f32; FEATURE_COUNT],
    pub bump: u8,
}

impl NodeFeatures {
    pub const LEN: usize = 8 + // discriminator
        32 +                   // authority
        8 +                    // last_update
        4 * FEATURE_COUNT + // price_periods
        4 * FEATURE_COUNT + // computed_features
        1; // bump
}

/// Circular buffer of recently observed midprices.
#[account]
pub struct PriceHistory {
    pub authority: Pubkey,
    pub last_updated: i64,
    pub current_index: u16,
    pub prices: [f32; PRICE_CAPACITY],
    pub timestamps: [i64; PRICE_CAPACITY],
    pub is_full: bool,
    pub bump: u8,
}

impl PriceHistory {
    pub const LEN: usize = 8 + // discriminator
        32 +                   // authority
        8 +                    // last_updated
        2 +                    // current_index
        4 * PRICE_CAPACITY +   // prices
        8 * PRICE_CAPACITY +   // timestamps
        1 +                    // is_full
        1; // bump

    /// Write one sample at the cursor and advance it.
    pub fn push(&mut self, price: f32, timestamp: i64) {
        self.prices[self.current_index as usize] = price;
        self.timestamps[self.current_index as usize] = timestamp;
        self.last_updated = timestamp;

        self.current_index = (self.current_index + 1) % PRICE_CAPACITY as u16;
        if self.current_index == 0 && !self.is_full {
            self.is_full = true;
        }
    }

    /// Number of samples currently stored.
    pub fn available(&self) -> usize {
        if self.is_full {
            PRICE_CAPACITY
        } else {
            self.current_index as usize
        }
    }

    /// Up to `count` most recent prices, newest first.
    pub fn recent(&self, count: usize) -> Vec<f32> {
        let take = count.min(self.available());
        let mut out = Vec::with_capacity(take);
        for i in 0..take {
            let idx = (self.current_index as usize + PRICE_CAPACITY - 1 - i) % PRICE_CAPACITY;
            out.push(self.prices[idx]);
        }
        out
    }

    pub fn latest(&self) -> Option<f32> {
        if self.available() == 0 {
            return None;
        }
        let idx = (self.current_index as usize + PRICE_CAPACITY - 1) % PRICE_CAPACITY;
        Some(self.prices[idx])
    }
}

/// Latest classification outcome.
#[account]
pub struct NodeResults {
    pub authority: Pubkey,
    pub last_update: i64,
    pub latest_prediction: u8,
    pub confidence: f32,
    pub price_at_prediction: f32,
    pub predictions_count: u32,
    pub bump: u8,
}

impl NodeResults {
    pub const LEN: usize = 8 + // discriminator
        32 +                   // authority
        8 +                    // last_update
        1 +                    // latest_prediction
        4 +                    // confidence
        4 +                    // price_at_prediction
        4 +                    // predictions_count
        1; // bump

    pub fn record(&mut self, prediction: u8, confidence: f32, price: f32, now: i64) {
        self.latest_prediction = prediction;
        self.confidence = confidence;
        self.price_at_prediction = price;
        self.predictions_count = self.predictions_count.saturating_add(1);
        self.last_update = now;
    }
}

// ------------ Events ------------

#[event]
pub struct NodeInitialized {
    pub authority: Pubkey,
    pub created_at: i64,
}

#[event]
pub struct ParamsInitialized {
    pub authority: Pubkey,
    pub weights: [f32; FEATURE_COUNT],
    pub bias: f32,
}

#[event]
pub struct FeaturesConfigured {
    pub authority: Pubkey,
    pub price_periods: [u32; FEATURE_COUNT],
}

#[event]
pub struct PriceRecorded {
    pub authority: Pubkey,
    pub price: f32,
    pub publish_time: i64,
    pub samples: u16,
}

#[event]
pub struct FeaturesComputed {
    pub authority: Pubkey,
    pub features: [f32; FEATURE_COUNT],
}

#[event]
pub struct PredictionMade {
    pub authority: Pubkey,
    pub prediction: u8,
    pub confidence: f32,
    pub price: f32,
}

#[event]
pub struct ActiveToggled {
    pub authority: Pubkey,
    pub active: bool,
}

// ------------ Errors ------------

#[error_code]
pub enum NodeError {
    #[msg("Oracle sample is too old")]
    StalePrice,
    #[msg("Oracle confidence interval too wide")]
    LowPriceConfidence,
    #[msg("Invalid price data received")]
    InvalidPrice,
    #[msg("Insufficient price history for calculations")]
    InsufficientPriceHistory,
    #[msg("Indicator is not active")]
    IndicatorInactive,
    #[msg("Moving-average period out of range")]
    InvalidPeriod,
    #[msg("Invalid feed id")]
    InvalidFeedId,
    #[msg("Price feed not found")]
    PriceFeedNotFound,
    #[msg("Unauthorized access")]
    Unauthorized,
}

/// Every period must fit inside the ring buffer.
pub fn validate_periods(periods: &[u32; FEATURE_COUNT]) -> Result<()> {
    for &period in periods.iter() {
        require!(
            period >= 1 && period as usize <= PRICE_CAPACITY,
            NodeError::InvalidPeriod
        );
    }
    Ok(())
}
