//! In-memory consensus layer for tests.
//!
//! Keeps its own output set and fund pool and emits the same diffs a real
//! consensus set would: spent outputs are reverted, created outputs applied,
//! and reverting the tip replays the block's diffs backwards.

use std::collections::HashMap;

use bitcoin::hashes::{sha256d, Hash};

use crate::sync::types::{
    Address, Block, BlockId, CoinInput, CoinOutput, CoinOutputDiff, ConsensusChange, Currency,
    DiffDirection, FundInput, FundOutput, FundOutputDiff, FundPoolDiff, OutputId, Transaction,
    TransactionId,
};

struct MinedBlock {
    block: Block,
    coin_diffs: Vec<CoinOutputDiff>,
    fund_diffs: Vec<FundOutputDiff>,
    pool_diff: Option<FundPoolDiff>,
}

#[derive(Default)]
pub struct MockConsensus {
    coin_outputs: HashMap<OutputId, CoinOutput>,
    fund_outputs: HashMap<OutputId, FundOutput>,
    pool: Currency,
    chain: Vec<MinedBlock>,
    nonce: u64,
}

pub fn address(tag: &str) -> Address {
    Address::from_unlock_key(tag.as_bytes())
}

impl MockConsensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> Currency {
        self.pool
    }

    fn next_hash(&mut self, domain: &str) -> sha256d::Hash {
        self.nonce += 1;
        sha256d::Hash::hash(format!("{}-{}", domain, self.nonce).as_bytes())
    }

    /// An empty transaction with a fresh id.
    pub fn transaction(&mut self) -> Transaction {
        Transaction::new(TransactionId(self.next_hash("txn")))
    }

    /// A transaction paying `value` coins to `to` out of thin air.
    pub fn coin_payment(&mut self, to: Address, value: Currency) -> Transaction {
        let mut txn = self.transaction();
        txn.coin_inputs.push(CoinInput {
            parent_id: OutputId(self.next_hash("foreign")),
            unlock_address: address("outsider"),
        });
        txn.coin_outputs.push(CoinOutput { value, address: to });
        txn
    }

    /// A transaction spending coin output `parent` owned by `from`.
    pub fn coin_spend(
        &mut self,
        parent: OutputId,
        from: Address,
        to: Address,
        value: Currency,
    ) -> Transaction {
        let mut txn = self.transaction();
        txn.coin_inputs.push(CoinInput {
            parent_id: parent,
            unlock_address: from,
        });
        txn.coin_outputs.push(CoinOutput { value, address: to });
        txn
    }

    /// A transaction spending fund output `parent` and moving the funds to `to`.
    pub fn fund_spend(
        &mut self,
        parent: OutputId,
        from: Address,
        to: Address,
        quantity: Currency,
    ) -> Transaction {
        let mut txn = self.transaction();
        txn.fund_inputs.push(FundInput {
            parent_id: parent,
            unlock_address: from,
            claim_address: from,
        });
        txn.fund_outputs.push(FundOutput {
            value: quantity,
            address: to,
            claim_start: 0,
        });
        txn
    }

    /// Appends a block and returns the change that announces it.
    ///
    /// Fund outputs get the pool level before `pool_increase` as their claim
    /// start.
    pub fn mine(
        &mut self,
        mut transactions: Vec<Transaction>,
        miner_payouts: Vec<CoinOutput>,
        pool_increase: Currency,
    ) -> ConsensusChange {
        let mut coin_diffs = Vec::new();
        let mut fund_diffs = Vec::new();

        for txn in &mut transactions {
            for input in &txn.coin_inputs {
                if let Some(output) = self.coin_outputs.remove(&input.parent_id) {
                    coin_diffs.push(CoinOutputDiff {
                        direction: DiffDirection::Revert,
                        id: input.parent_id,
                        output,
                    });
                }
            }
            for (i, output) in txn.coin_outputs.iter().enumerate() {
                let id = txn.coin_output_id(i as u64);
                self.coin_outputs.insert(id, output.clone());
                coin_diffs.push(CoinOutputDiff {
                    direction: DiffDirection::Apply,
                    id,
                    output: output.clone(),
                });
            }
            for input in &txn.fund_inputs {
                if let Some(output) = self.fund_outputs.remove(&input.parent_id) {
                    fund_diffs.push(FundOutputDiff {
                        direction: DiffDirection::Revert,
                        id: input.parent_id,
                        output,
                    });
                }
            }
            for output in &mut txn.fund_outputs {
                output.claim_start = self.pool;
            }
            for (i, output) in txn.fund_outputs.iter().enumerate() {
                let id = txn.fund_output_id(i as u64);
                self.fund_outputs.insert(id, output.clone());
                fund_diffs.push(FundOutputDiff {
                    direction: DiffDirection::Apply,
                    id,
                    output: output.clone(),
                });
            }
        }

        let pool_diff = (pool_increase > 0).then(|| {
            let diff = FundPoolDiff {
                direction: DiffDirection::Apply,
                previous: self.pool,
                adjusted: self.pool + pool_increase,
            };
            self.pool = diff.adjusted;
            diff
        });

        let block = Block {
            id: BlockId(self.next_hash("block")),
            timestamp: 1_000 + self.chain.len() as u64,
            miner_payouts,
            transactions,
        };

        let cc = ConsensusChange {
            coin_output_diffs: coin_diffs.clone(),
            fund_output_diffs: fund_diffs.clone(),
            fund_pool_diffs: pool_diff.into_iter().collect(),
            reverted_blocks: Vec::new(),
            applied_blocks: vec![block.clone()],
            synced: false,
        };
        self.chain.push(MinedBlock {
            block,
            coin_diffs,
            fund_diffs,
            pool_diff,
        });
        cc
    }

    /// Removes the tip block and returns the change that announces it.
    pub fn revert_tip(&mut self) -> ConsensusChange {
        let mined = self.chain.pop().expect("mock chain is empty");

        let coin_output_diffs = mined
            .coin_diffs
            .into_iter()
            .rev()
            .map(|diff| {
                let direction = flip(diff.direction);
                match direction {
                    DiffDirection::Apply => self.coin_outputs.insert(diff.id, diff.output.clone()),
                    DiffDirection::Revert => self.coin_outputs.remove(&diff.id),
                };
                CoinOutputDiff { direction, ..diff }
            })
            .collect();
        let fund_output_diffs = mined
            .fund_diffs
            .into_iter()
            .rev()
            .map(|diff| {
                let direction = flip(diff.direction);
                match direction {
                    DiffDirection::Apply => self.fund_outputs.insert(diff.id, diff.output.clone()),
                    DiffDirection::Revert => self.fund_outputs.remove(&diff.id),
                };
                FundOutputDiff { direction, ..diff }
            })
            .collect();
        let fund_pool_diffs = mined
            .pool_diff
            .map(|diff| {
                self.pool = diff.previous;
                FundPoolDiff {
                    direction: DiffDirection::Revert,
                    ..diff
                }
            })
            .into_iter()
            .collect();

        ConsensusChange {
            coin_output_diffs,
            fund_output_diffs,
            fund_pool_diffs,
            reverted_blocks: vec![mined.block],
            applied_blocks: Vec::new(),
            synced: false,
        }
    }
}

fn flip(direction: DiffDirection) -> DiffDirection {
    match direction {
        DiffDirection::Apply => DiffDirection::Revert,
        DiffDirection::Revert => DiffDirection::Apply,
    }
}

/// Concatenates changes into one, the way a reorg is announced in a single
/// notification.
pub fn merge(changes: Vec<ConsensusChange>) -> ConsensusChange {
    let mut merged = ConsensusChange::default();
    for cc in changes {
        merged.coin_output_diffs.extend(cc.coin_output_diffs);
        merged.fund_output_diffs.extend(cc.fund_output_diffs);
        merged.fund_pool_diffs.extend(cc.fund_pool_diffs);
        merged.reverted_blocks.extend(cc.reverted_blocks);
        merged.applied_blocks.extend(cc.applied_blocks);
        merged.synced = cc.synced;
    }
    merged
}
