//! Chain-side data model.
//!
//! These are the values pushed into the wallet by the consensus layer. They are
//! already validated upstream; the wallet only reads them.

use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::{sha256, sha256d, Hash, HashEngine};
use serde::{Deserialize, Serialize};

pub type Currency = u128;
pub type BlockHeight = u64;
pub type Timestamp = u64;

/// Height recorded on entries that are not part of the canonical chain yet.
pub const UNCONFIRMED_HEIGHT: BlockHeight = BlockHeight::MAX;

/// Timestamp recorded on entries that are not part of the canonical chain yet.
pub const UNCONFIRMED_TIMESTAMP: Timestamp = Timestamp::MAX;

const COIN_OUTPUT_SPECIFIER: &[u8] = b"coin output";
const FUND_OUTPUT_SPECIFIER: &[u8] = b"fund output";
const MINER_PAYOUT_SPECIFIER: &[u8] = b"miner payout";

/// Hash of the unlock conditions that can spend an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub sha256::Hash);

impl Address {
    /// Derives the address controlled by the given unlock key.
    pub fn from_unlock_key(key: &[u8]) -> Self {
        Address(sha256::Hash::hash(key))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Address {
    type Err = <sha256::Hash as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        sha256::Hash::from_str(s).map(Address)
    }
}

macro_rules! chain_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub sha256d::Hash);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = <sha256d::Hash as FromStr>::Err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                sha256d::Hash::from_str(s).map($name)
            }
        }
    };
}

chain_id!(
    /// Identifier of a transaction.
    TransactionId
);
chain_id!(
    /// Identifier of a block.
    BlockId
);
chain_id!(
    /// Identifier of any output (coin, fund, miner payout).
    OutputId
);

impl OutputId {
    /// Derives the identifier of the `index`th output of kind `specifier`
    /// created by `parent`.
    fn derive(specifier: &[u8], parent: &sha256d::Hash, index: u64) -> Self {
        let mut engine = sha256d::Hash::engine();
        engine.input(specifier);
        engine.input(parent.as_byte_array());
        engine.input(&index.to_le_bytes());
        OutputId(sha256d::Hash::from_engine(engine))
    }
}

impl From<BlockId> for TransactionId {
    /// Miner payout entries are logged under the identifier of their block.
    fn from(id: BlockId) -> Self {
        TransactionId(id.0)
    }
}

/// The two asset classes tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Primary coin.
    Coin,
    /// Pool-bearing fund.
    Fund,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Coin => f.write_str("coin"),
            AssetKind::Fund => f.write_str("fund"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOutput {
    pub value: Currency,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundOutput {
    pub value: Currency,
    pub address: Address,
    /// Fund pool level at the moment the output was created.
    pub claim_start: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInput {
    pub parent_id: OutputId,
    /// Address of the unlock conditions satisfied by this input.
    pub unlock_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundInput {
    pub parent_id: OutputId,
    pub unlock_address: Address,
    /// Receiver of the claim payout released by spending the fund output.
    pub claim_address: Address,
}

/// A transaction that has already been validated by the consensus layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(default)]
    pub coin_inputs: Vec<CoinInput>,
    #[serde(default)]
    pub coin_outputs: Vec<CoinOutput>,
    #[serde(default)]
    pub fund_inputs: Vec<FundInput>,
    #[serde(default)]
    pub fund_outputs: Vec<FundOutput>,
    #[serde(default)]
    pub miner_fees: Vec<Currency>,
}

impl Transaction {
    /// An empty transaction with the given identifier.
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            coin_inputs: Vec::new(),
            coin_outputs: Vec::new(),
            fund_inputs: Vec::new(),
            fund_outputs: Vec::new(),
            miner_fees: Vec::new(),
        }
    }

    pub fn coin_output_id(&self, index: u64) -> OutputId {
        OutputId::derive(COIN_OUTPUT_SPECIFIER, &self.id.0, index)
    }

    pub fn fund_output_id(&self, index: u64) -> OutputId {
        OutputId::derive(FUND_OUTPUT_SPECIFIER, &self.id.0, index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub miner_payouts: Vec<CoinOutput>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn miner_payout_id(&self, index: u64) -> OutputId {
        OutputId::derive(MINER_PAYOUT_SPECIFIER, &self.id.0, index)
    }
}

/// Whether a diff moves the chain forward or unwinds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffDirection {
    Apply,
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputId,
    pub output: CoinOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputId,
    pub output: FundOutput,
}

/// Change of the fund pool level. Both sides are carried so a revert restores
/// the exact previous level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundPoolDiff {
    pub direction: DiffDirection,
    pub previous: Currency,
    pub adjusted: Currency,
}

/// One notification from the consensus layer.
///
/// Diffs and blocks are in the order the consensus layer applied them;
/// `reverted_blocks` is newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusChange {
    #[serde(default)]
    pub coin_output_diffs: Vec<CoinOutputDiff>,
    #[serde(default)]
    pub fund_output_diffs: Vec<FundOutputDiff>,
    #[serde(default)]
    pub fund_pool_diffs: Vec<FundPoolDiff>,
    #[serde(default)]
    pub reverted_blocks: Vec<Block>,
    #[serde(default)]
    pub applied_blocks: Vec<Block>,
    /// The consensus layer has caught up with its peers.
    #[serde(default)]
    pub synced: bool,
}
