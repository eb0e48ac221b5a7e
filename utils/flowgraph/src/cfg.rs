use std::fmt::Display;

use log::trace;

pub use crate::basicblock::{BasicBlock, BlockId};

/// Directed control flow graph owning its blocks in an id-indexed arena.
///
/// Mutable only while the driver is adding nodes and edges; every engine
/// takes it by shared reference afterwards.
pub struct CFG {
	blocks: Vec<Option<BasicBlock>>,
}

impl CFG {
	pub fn new() -> Self {
		Self { blocks: Vec::new() }
	}

	/// Returns the block with this id, materializing an empty one first
	/// if it does not exist yet.
	pub fn create_node(&mut self, id: BlockId) -> &mut BasicBlock {
		if id >= self.blocks.len() {
			self.blocks.resize_with(id + 1, || None);
		}
		self.blocks[id].get_or_insert_with(|| BasicBlock::new(id))
	}

	/// Wires `from -> to` on both adjacency lists, creating either
	/// endpoint on demand. Parallel edges accumulate.
	pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
		trace!("link BB#{:03} -> BB#{:03}", from, to);
		self.create_node(from).succs.push(to);
		self.create_node(to).preds.push(from);
	}

	pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
		self.blocks.get(id).and_then(|slot| slot.as_ref())
	}

	/// Arena access for ids known to be populated. Panics on a dangling
	/// id, which only an engine bug can produce.
	pub fn node(&self, id: BlockId) -> &BasicBlock {
		self.blocks[id].as_ref().unwrap()
	}

	pub fn start_block(&self) -> Option<&BasicBlock> {
		self.block(0)
	}

	pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
		self
			.blocks
			.iter()
			.enumerate()
			.filter_map(|(id, slot)| Some((id, slot.as_ref()?)))
	}

	pub fn num_nodes(&self) -> usize {
		self.blocks().count()
	}

	/// Exclusive upper bound on block ids, for per-id scratch arrays.
	pub fn id_bound(&self) -> usize {
		self.blocks.len()
	}
}

impl Default for CFG {
	fn default() -> Self {
		Self::new()
	}
}

impl Display for CFG {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{}",
			self
				.blocks()
				.map(|(_, block)| block.to_string())
				.collect::<Vec<_>>()
				.join("\n")
		)
	}
}
