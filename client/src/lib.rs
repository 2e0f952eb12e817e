//! Off-chain surface for the signalnode program.
//!
//! The program is reached through an explicit [`ClientConfig`]: cluster,
//! wallet, commitment, and program id are all passed in by the caller, never
//! read from ambient environment state. The one remote operation is modelled
//! as the [`StateInitializer`] capability trait.

pub mod error;

pub use error::InitializeError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anchor_client::{
    solana_sdk::{
        commitment_config::CommitmentConfig,
        pubkey::Pubkey,
        signature::{read_keypair_file, Keypair, Signature},
        signer::Signer,
        system_program,
    },
    Client, Cluster, Program,
};

/// Explicit connection configuration for one wallet against one deployment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cluster: Cluster,
    pub wallet: PathBuf,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
}

impl ClientConfig {
    pub fn new(cluster: Cluster, wallet: impl AsRef<Path>) -> Self {
        Self {
            cluster,
            wallet: wallet.as_ref().to_path_buf(),
            commitment: CommitmentConfig::confirmed(),
            program_id: signalnode::ID,
        }
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }
}

/// The single remote operation the program exposes to callers: create the
/// per-wallet state account, returning the confirming signature or a
/// classified failure.
pub trait StateInitializer {
    fn initialize(&self) -> Result<Signature, InitializeError>;
}

/// Connected client bound to one wallet and one program deployment.
pub struct SignalNodeClient {
    program: Program<Arc<Keypair>>,
    authority: Pubkey,
}

impl SignalNodeClient {
    /// Load the wallet named by `config` and open an RPC connection.
    pub fn connect(config: &ClientConfig) -> Result<Self, InitializeError> {
        let payer = read_keypair_file(&config.wallet).map_err(|err| {
            InitializeError::Wallet(format!("{}: {}", config.wallet.display(), err))
        })?;
        let payer = Arc::new(payer);
        let authority = payer.pubkey();
        let client = Client::new_with_options(config.cluster.clone(), payer, config.commitment);
        let program = client.program(config.program_id)?;
        Ok(Self { program, authority })
    }

    pub fn authority(&self) -> Pubkey {
        self.authority
    }

    /// Canonical state address for this wallet.
    pub fn state_address(&self) -> Pubkey {
        state_address(&self.authority, &self.program.id())
    }
}

impl StateInitializer for SignalNodeClient {
    fn initialize(&self) -> Result<Signature, InitializeError> {
        let node_state = self.state_address();
        self.program
            .request()
            .accounts(signalnode::accounts::Initialize {
                node_state,
                authority: self.authority,
                system_program: system_program::ID,
            })
            .args(signalnode::instruction::Initialize {})
            .send()
            .map_err(InitializeError::classify)
    }
}

/// Derive the node-state PDA for `authority` under `program_id`.
pub fn state_address(authority: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"node_state", authority.as_ref()], program_id).0
}
