use anchor_lang::{AccountDeserialize, AccountSerialize, InstructionData, ToAccountMetas};
use pyth_solana_receiver_sdk::price_update::{get_feed_id_from_hex, PriceUpdateV2, VerificationLevel};
use pythnet_sdk::messages::PriceFeedMessage;
use solana_program_test::{processor, ProgramTest};
use solana_sdk::{
    account::Account as SolAccount, instruction::Instruction, pubkey::Pubkey, signer::Signer,
    system_instruction, system_program, transaction::Transaction, transport::TransportError,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn pda(tag: &[u8], authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[tag, authority.as_ref()], &signalnode::ID).0
}

fn ix(accounts: impl ToAccountMetas, data: impl InstructionData) -> Instruction {
    Instruction {
        program_id: signalnode::ID,
        accounts: accounts.to_account_metas(None),
        data: data.data(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs() as i64
}

/// Pack a pyth price-update account the way the receiver program would have
/// written it, so `record_price` can read it without the full oracle stack.
fn price_update_account(
    feed_hex: &str,
    price: i64,
    conf: u64,
    exponent: i32,
    publish_time: i64,
) -> SolAccount {
    let feed_id = get_feed_id_from_hex(feed_hex).expect("bad feed hex");
    let update = PriceUpdateV2 {
        write_authority: Pubkey::default(),
        verification_level: VerificationLevel::Full,
        price_message: PriceFeedMessage {
            feed_id,
            price,
            conf,
            exponent,
            publish_time,
            prev_publish_time: publish_time,
            ema_price: price,
            ema_conf: conf,
        },
        posted_slot: 1,
    };
    let mut data = Vec::new();
    update.try_serialize(&mut data).expect("serialize update");
    SolAccount {
        lamports: 1_000_000_000,
        data,
        owner: pyth_solana_receiver_sdk::ID,
        executable: false,
        rent_epoch: 0,
    }
}

#[tokio::test]
async fn full_signal_pipeline() -> std::result::Result<(), TransportError> {
    let mut program_test =
        ProgramTest::new("signalnode", signalnode::ID, processor!(signalnode::entry));

    // SOL/USD at 150.0, USDC/USD at 1.0, both fresh and tightly confident
    let now = unix_now();
    let sol_update = Pubkey::new_unique();
    let usdc_update = Pubkey::new_unique();
    program_test.add_account(
        sol_update,
        price_update_account(signalnode::SOL_USD_FEED_HEX, 15_000_000_000, 7_500_000, -8, now),
    );
    program_test.add_account(
        usdc_update,
        price_update_account(signalnode::USDC_USD_FEED_HEX, 100_000_000, 50_000, -8, now),
    );

    let (mut banks_client, payer, recent_blockhash) = program_test.start().await;
    let authority = payer.pubkey();

    let node_state = pda(b"node_state", &authority);
    let node_params = pda(b"node_params", &authority);
    let node_features = pda(b"node_features", &authority);
    let price_history = pda(b"price_history", &authority);
    let node_results = pda(b"node_results", &authority);

    // zero weights and a positive bias make the expected class deterministic
    let weights = [0.0f32; 5];
    let bias = 3.0f32;
    let periods = [1u32, 2, 3, 3, 2];

    let setup = [
        ix(
            signalnode::accounts::Initialize {
                node_state,
                authority,
                system_program: system_program::id(),
            },
            signalnode::instruction::Initialize {},
        ),
        ix(
            signalnode::accounts::InitializeParams {
                node_params,
                node_state,
                authority,
                system_program: system_program::id(),
            },
            signalnode::instruction::InitializeParams { weights, bias },
        ),
        ix(
            signalnode::accounts::InitializeFeatures {
                node_features,
                node_state,
                authority,
                system_program: system_program::id(),
            },
            signalnode::instruction::InitializeFeatures { periods },
        ),
        ix(
            signalnode::accounts::InitializePriceHistory {
                price_history,
                node_state,
                authority,
                system_program: system_program::id(),
            },
            signalnode::instruction::InitializePriceHistory {},
        ),
        ix(
            signalnode::accounts::InitializeResults {
                node_results,
                node_params,
                authority,
                system_program: system_program::id(),
            },
            signalnode::instruction::InitializeResults {},
        ),
    ];
    let tx = Transaction::new_signed_with_payer(
        &setup,
        Some(&authority),
        &[&payer],
        recent_blockhash,
    );
    banks_client
        .process_transaction(tx)
        .await
        .map_err(TransportError::from)?;

    // fill the longest moving-average window
    for i in 0..3u64 {
        // vary the transaction so banks_client never sees a duplicate
        let uniquifier = system_instruction::transfer(&authority, &authority, i + 1);
        let record = ix(
            signalnode::accounts::RecordPrice {
                price_history,
                base_price_update: sol_update,
                quote_price_update: usdc_update,
                authority,
            },
            signalnode::instruction::RecordPrice {},
        );
        let blockhash = banks_client
            .get_latest_blockhash()
            .await
            .map_err(TransportError::from)?;
        let tx = Transaction::new_signed_with_payer(
            &[uniquifier, record],
            Some(&authority),
            &[&payer],
            blockhash,
        );
        banks_client
            .process_transaction(tx)
            .await
            .map_err(TransportError::from)?;
    }

    let history_account = banks_client
        .get_account(price_history)
        .await?
        .expect("history missing");
    let history =
        signalnode::PriceHistory::try_deserialize(&mut history_account.data.as_slice())
            .expect("deserialize history");
    assert_eq!(history.available(), 3);
    assert!(!history.is_full);
    let latest = history.latest().expect("latest price");
    assert!((latest - 150.0).abs() < 1e-3, "midprice was {latest}");

    // features: every SMA over a constant series equals the price
    let compute = ix(
        signalnode::accounts::ComputeFeatures {
            node_features,
            price_history,
            authority,
        },
        signalnode::instruction::ComputeFeatures {},
    );
    let blockhash = banks_client
        .get_latest_blockhash()
        .await
        .map_err(TransportError::from)?;
    let tx = Transaction::new_signed_with_payer(&[compute], Some(&authority), &[&payer], blockhash);
    banks_client
        .process_transaction(tx)
        .await
        .map_err(TransportError::from)?;

    let features_account = banks_client
        .get_account(node_features)
        .await?
        .expect("features missing");
    let features =
        signalnode::NodeFeatures::try_deserialize(&mut features_account.data.as_slice())
            .expect("deserialize features");
    for value in features.computed_features {
        assert!((value - 150.0).abs() < 1e-3, "feature was {value}");
    }

    // inference: sigmoid(3.0) > 0.5 regardless of the zeroed weights
    let infer = ix(
        signalnode::accounts::RunInference {
            node_params,
            node_features,
            price_history,
            node_results,
            authority,
        },
        signalnode::instruction::RunInference {},
    );
    let blockhash = banks_client
        .get_latest_blockhash()
        .await
        .map_err(TransportError::from)?;
    let tx = Transaction::new_signed_with_payer(&[infer], Some(&authority), &[&payer], blockhash);
    banks_client
        .process_transaction(tx)
        .await
        .map_err(TransportError::from)?;

    let results_account = banks_client
        .get_account(node_results)
        .await?
        .expect("results missing");
    let results =
        signalnode::NodeResults::try_deserialize(&mut results_account.data.as_slice())
            .expect("deserialize results");
    assert_eq!(results.latest_prediction, 1);
    assert!(results.confidence > 0.9);
    assert!((results.price_at_prediction - 150.0).abs() < 1e-3);
    assert_eq!(results.predictions_count, 1);

    Ok(())
}
