use std::collections::BTreeSet;
use std::fmt::Display;

use itertools::Itertools;

use crate::basicblock::BlockId;

pub type LoopId = usize;

/// One recognized loop: the member blocks of a strongly connected
/// region (or a lone self-looping block), its header, and its place in
/// the nesting forest.
pub struct SimpleLoop {
	pub members: BTreeSet<BlockId>,
	pub header: Option<BlockId>,
	pub parent: Option<LoopId>,
	pub level: usize,
}

impl SimpleLoop {
	fn new() -> Self {
		Self {
			members: BTreeSet::new(),
			header: None,
			parent: None,
			level: 0,
		}
	}

	/// Duplicate insertions are ignored.
	pub fn add_node(&mut self, bb: BlockId) {
		self.members.insert(bb);
	}

	pub fn contains_block(&self, bb: BlockId) -> bool {
		self.members.contains(&bb)
	}
}

/// The loop forest. Owns every `SimpleLoop` in an arena and remembers
/// registration order for enumeration; callers hold `LoopId` handles.
pub struct LSG {
	loops: Vec<SimpleLoop>,
	order: Vec<LoopId>,
}

impl LSG {
	pub fn new() -> Self {
		Self {
			loops: Vec::new(),
			order: Vec::new(),
		}
	}

	/// Allocates a fresh empty loop, owned by this forest for its whole
	/// lifetime. The loop is not enumerated until `add_loop`.
	pub fn new_loop(&mut self) -> LoopId {
		self.loops.push(SimpleLoop::new());
		self.loops.len() - 1
	}

	/// Registers a loop for enumeration; `num_loops` counts these.
	pub fn add_loop(&mut self, id: LoopId) {
		self.order.push(id);
	}

	pub fn num_loops(&self) -> usize {
		self.order.len()
	}

	pub fn get(&self, id: LoopId) -> &SimpleLoop {
		&self.loops[id]
	}

	pub fn get_mut(&mut self, id: LoopId) -> &mut SimpleLoop {
		&mut self.loops[id]
	}

	/// The last write wins; `calculate_nesting_level` observes the final
	/// value.
	pub fn set_parent(&mut self, child: LoopId, parent: LoopId) {
		self.loops[child].parent = Some(parent);
	}

	/// Registered loops in registration order.
	pub fn loops(&self) -> impl Iterator<Item = (LoopId, &SimpleLoop)> {
		self.order.iter().map(move |&id| (id, &self.loops[id]))
	}

	/// Recomputes every loop's nesting depth from its parent chain:
	/// 0 for a parentless loop, otherwise one more than its parent.
	/// Memoized over the arena; safe to call repeatedly or on an empty
	/// forest.
	pub fn calculate_nesting_level(&mut self) {
		let mut levels = vec![None; self.loops.len()];
		for id in 0..self.loops.len() {
			self.resolve_level(id, &mut levels);
		}
		for (l, level) in self.loops.iter_mut().zip(levels) {
			l.level = level.unwrap();
		}
	}

	fn resolve_level(
		&self,
		id: LoopId,
		levels: &mut [Option<usize>],
	) -> usize {
		if let Some(level) = levels[id] {
			return level;
		}
		let level = match self.loops[id].parent {
			Some(parent) => self.resolve_level(parent, levels) + 1,
			None => 0,
		};
		levels[id] = Some(level);
		level
	}
}

impl Default for LSG {
	fn default() -> Self {
		Self::new()
	}
}

impl Display for LSG {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		for (id, l) in self.loops() {
			writeln!(
				f,
				"loop-{} depth {} header {} members: {}",
				id,
				l.level,
				l.header.map_or("none".to_string(), |h| format!("BB#{:03}", h)),
				l.members.iter().map(|bb| format!("BB#{:03}", bb)).join(" "),
			)?;
		}
		Ok(())
	}
}
