use serde::{Deserialize, Serialize};

use crate::sync::types::{
    Address, BlockHeight, Currency, Timestamp, Transaction, TransactionId, UNCONFIRMED_HEIGHT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Coin,
    Fund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    Coin,
    Fund,
    /// Payout released by spending a fund output.
    Claim,
    MinerPayout,
    MinerFee,
}

/// An input as shown in the wallet history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedInput {
    pub kind: InputKind,
    /// The spending address belongs to this wallet.
    pub owned: bool,
    pub related_address: Address,
    pub value: Currency,
}

/// An output as shown in the wallet history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedOutput {
    pub kind: OutputKind,
    pub maturity_height: BlockHeight,
    pub owned: bool,
    /// `None` for miner fees, which are not paid to an address.
    pub related_address: Option<Address>,
    pub value: Currency,
}

/// One entry of the wallet's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    /// `None` for the miner payout entry of a block.
    pub transaction: Option<Transaction>,
    pub transaction_id: TransactionId,
    pub confirmation_height: BlockHeight,
    pub confirmation_timestamp: Timestamp,
    pub inputs: Vec<ProcessedInput>,
    pub outputs: Vec<ProcessedOutput>,
}

impl ProcessedTransaction {
    /// At least one input or output belongs to this wallet.
    pub fn is_relevant(&self) -> bool {
        self.inputs.iter().any(|i| i.owned) || self.outputs.iter().any(|o| o.owned)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation_height != UNCONFIRMED_HEIGHT
    }

    /// Some input or output of this entry is related to `address`.
    pub fn involves(&self, address: &Address) -> bool {
        self.inputs.iter().any(|i| i.related_address == *address)
            || self
                .outputs
                .iter()
                .any(|o| o.related_address.as_ref() == Some(address))
    }
}

/// Spendable balances of the confirmed output set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedBalance {
    pub coins: Currency,
    pub funds: Currency,
    /// Coins claimable by spending every held fund output right now.
    pub claims: Currency,
}
