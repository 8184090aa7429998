use crate::{
    codec::{self, CodecError},
    ids::BlockId,
    tx::Tx,
};
use borsh::{BorshDeserialize, BorshSerialize};
use omega_hashes::sha256;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CommonBlock {
    pub parent_id: BlockId,
    pub height: u64,
}

impl CommonBlock {
    pub fn new(parent_id: BlockId, height: u64) -> Self {
        Self { parent_id, height }
    }
}

/// Payload of every block flavor. Apricot blocks inherit the chain time from their
/// content, Banff blocks carry their own timestamp.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum BlockBody {
    ApricotProposal { common: CommonBlock, tx: Tx },
    ApricotStandard { common: CommonBlock, txs: Vec<Tx> },
    ApricotAtomic { common: CommonBlock, tx: Tx },
    ApricotCommit { common: CommonBlock },
    ApricotAbort { common: CommonBlock },
    BanffProposal { common: CommonBlock, timestamp: u64, tx: Tx },
    BanffStandard { common: CommonBlock, timestamp: u64, txs: Vec<Tx> },
    BanffCommit { common: CommonBlock, timestamp: u64 },
    BanffAbort { common: CommonBlock, timestamp: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Proposal,
    Standard,
    Atomic,
    Commit,
    Abort,
}

impl BlockKind {
    pub fn is_option(self) -> bool {
        matches!(self, BlockKind::Commit | BlockKind::Abort)
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlockKind::Proposal => "proposal",
            BlockKind::Standard => "standard",
            BlockKind::Atomic => "atomic",
            BlockKind::Commit => "commit",
            BlockKind::Abort => "abort",
        };
        f.write_str(name)
    }
}

impl BlockBody {
    pub fn common(&self) -> &CommonBlock {
        match self {
            BlockBody::ApricotProposal { common, .. }
            | BlockBody::ApricotStandard { common, .. }
            | BlockBody::ApricotAtomic { common, .. }
            | BlockBody::ApricotCommit { common }
            | BlockBody::ApricotAbort { common }
            | BlockBody::BanffProposal { common, .. }
            | BlockBody::BanffStandard { common, .. }
            | BlockBody::BanffCommit { common, .. }
            | BlockBody::BanffAbort { common, .. } => common,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockBody::ApricotProposal { .. } | BlockBody::BanffProposal { .. } => BlockKind::Proposal,
            BlockBody::ApricotStandard { .. } | BlockBody::BanffStandard { .. } => BlockKind::Standard,
            BlockBody::ApricotAtomic { .. } => BlockKind::Atomic,
            BlockBody::ApricotCommit { .. } | BlockBody::BanffCommit { .. } => BlockKind::Commit,
            BlockBody::ApricotAbort { .. } | BlockBody::BanffAbort { .. } => BlockKind::Abort,
        }
    }

    pub fn timestamp(&self) -> Option<u64> {
        match self {
            BlockBody::BanffProposal { timestamp, .. }
            | BlockBody::BanffStandard { timestamp, .. }
            | BlockBody::BanffCommit { timestamp, .. }
            | BlockBody::BanffAbort { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    pub fn txs(&self) -> &[Tx] {
        match self {
            BlockBody::ApricotProposal { tx, .. } | BlockBody::ApricotAtomic { tx, .. } | BlockBody::BanffProposal { tx, .. } => {
                std::slice::from_ref(tx)
            }
            BlockBody::ApricotStandard { txs, .. } | BlockBody::BanffStandard { txs, .. } => txs,
            _ => &[],
        }
    }
}

/// An immutable, content addressed block. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    bytes: Arc<[u8]>,
    body: Arc<BlockBody>,
}

impl Block {
    pub fn new(body: BlockBody) -> Result<Self, CodecError> {
        let bytes: Arc<[u8]> = codec::encode(&body)?.into();
        Ok(Self { id: sha256(&bytes), bytes, body: Arc::new(body) })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let body: BlockBody = codec::decode(bytes)?;
        Ok(Self { id: sha256(bytes), bytes: bytes.into(), body: Arc::new(body) })
    }

    pub fn new_apricot_proposal(parent_id: BlockId, height: u64, tx: Tx) -> Result<Self, CodecError> {
        Self::new(BlockBody::ApricotProposal { common: CommonBlock::new(parent_id, height), tx })
    }

    pub fn new_apricot_standard(parent_id: BlockId, height: u64, txs: Vec<Tx>) -> Result<Self, CodecError> {
        Self::new(BlockBody::ApricotStandard { common: CommonBlock::new(parent_id, height), txs })
    }

    pub fn new_apricot_atomic(parent_id: BlockId, height: u64, tx: Tx) -> Result<Self, CodecError> {
        Self::new(BlockBody::ApricotAtomic { common: CommonBlock::new(parent_id, height), tx })
    }

    pub fn new_apricot_commit(parent_id: BlockId, height: u64) -> Result<Self, CodecError> {
        Self::new(BlockBody::ApricotCommit { common: CommonBlock::new(parent_id, height) })
    }

    pub fn new_apricot_abort(parent_id: BlockId, height: u64) -> Result<Self, CodecError> {
        Self::new(BlockBody::ApricotAbort { common: CommonBlock::new(parent_id, height) })
    }

    pub fn new_banff_proposal(timestamp: u64, parent_id: BlockId, height: u64, tx: Tx) -> Result<Self, CodecError> {
        Self::new(BlockBody::BanffProposal { common: CommonBlock::new(parent_id, height), timestamp, tx })
    }

    pub fn new_banff_standard(timestamp: u64, parent_id: BlockId, height: u64, txs: Vec<Tx>) -> Result<Self, CodecError> {
        Self::new(BlockBody::BanffStandard { common: CommonBlock::new(parent_id, height), timestamp, txs })
    }

    pub fn new_banff_commit(timestamp: u64, parent_id: BlockId, height: u64) -> Result<Self, CodecError> {
        Self::new(BlockBody::BanffCommit { common: CommonBlock::new(parent_id, height), timestamp })
    }

    pub fn new_banff_abort(timestamp: u64, parent_id: BlockId, height: u64) -> Result<Self, CodecError> {
        Self::new(BlockBody::BanffAbort { common: CommonBlock::new(parent_id, height), timestamp })
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn parent_id(&self) -> BlockId {
        self.body.common().parent_id
    }

    pub fn height(&self) -> u64 {
        self.body.common().height
    }

    /// The block timestamp for Banff blocks, `None` for Apricot blocks
    pub fn timestamp(&self) -> Option<u64> {
        self.body.timestamp()
    }

    pub fn txs(&self) -> &[Tx] {
        self.body.txs()
    }

    pub fn kind(&self) -> BlockKind {
        self.body.kind()
    }

    pub fn is_banff(&self) -> bool {
        self.timestamp().is_some()
    }

    pub fn visit<V: BlockVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self.body.as_ref() {
            BlockBody::ApricotProposal { tx, .. } => visitor.apricot_proposal_block(self, tx),
            BlockBody::ApricotStandard { txs, .. } => visitor.apricot_standard_block(self, txs),
            BlockBody::ApricotAtomic { tx, .. } => visitor.apricot_atomic_block(self, tx),
            BlockBody::ApricotCommit { .. } => visitor.apricot_commit_block(self),
            BlockBody::ApricotAbort { .. } => visitor.apricot_abort_block(self),
            BlockBody::BanffProposal { timestamp, tx, .. } => visitor.banff_proposal_block(self, *timestamp, tx),
            BlockBody::BanffStandard { timestamp, txs, .. } => visitor.banff_standard_block(self, *timestamp, txs),
            BlockBody::BanffCommit { timestamp, .. } => visitor.banff_commit_block(self, *timestamp),
            BlockBody::BanffAbort { timestamp, .. } => visitor.banff_abort_block(self, *timestamp),
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

/// One method per block flavor, driven by [`Block::visit`]
pub trait BlockVisitor {
    type Output;

    fn apricot_proposal_block(&mut self, block: &Block, tx: &Tx) -> Self::Output;
    fn apricot_standard_block(&mut self, block: &Block, txs: &[Tx]) -> Self::Output;
    fn apricot_atomic_block(&mut self, block: &Block, tx: &Tx) -> Self::Output;
    fn apricot_commit_block(&mut self, block: &Block) -> Self::Output;
    fn apricot_abort_block(&mut self, block: &Block) -> Self::Output;
    fn banff_proposal_block(&mut self, block: &Block, timestamp: u64, tx: &Tx) -> Self::Output;
    fn banff_standard_block(&mut self, block: &Block, timestamp: u64, txs: &[Tx]) -> Self::Output;
    fn banff_commit_block(&mut self, block: &Block, timestamp: u64) -> Self::Output;
    fn banff_abort_block(&mut self, block: &Block, timestamp: u64) -> Self::Output;
}
