use std::collections::HashSet;

use log::trace;

use flowgraph::basicblock::BlockId;
use flowgraph::cfg::CFG;
use flowgraph::lsg::LSG;

// Deferred work replayed off an explicit stack instead of the call
// stack; the benchmark graphs reach DFS chains tens of thousands deep.
enum Frame {
	Enter(BlockId),
	Lowlink(BlockId, BlockId), // low[u] = min(low[u], low[v])
	Settle(BlockId),
}

/// Single-threaded SCC decomposition over the blocks reachable from the
/// start block. Every component larger than one block, and every lone
/// block that loops back to itself, is emitted as a loop.
pub struct TarjanLoopFinder<'a> {
	cfg: &'a CFG,
	dfs: Vec<Option<usize>>,
	low: Vec<Option<usize>>,
	in_stack: Vec<bool>,
	block_stack: Vec<BlockId>,
	frame_stack: Vec<Frame>,
	next_dfs_order: usize,
}

impl<'a> TarjanLoopFinder<'a> {
	pub fn new(cfg: &'a CFG) -> Self {
		let bound = cfg.id_bound();
		Self {
			cfg,
			dfs: vec![None; bound],
			low: vec![None; bound],
			in_stack: vec![false; bound],
			block_stack: Vec::new(),
			frame_stack: Vec::new(),
			next_dfs_order: 0,
		}
	}

	pub fn find_loops(&mut self, lsg: &mut LSG) {
		let start = match self.cfg.start_block() {
			Some(block) => block.id,
			None => return,
		};
		self.frame_stack.push(Frame::Enter(start));
		self.main_loop(lsg);
		lsg.calculate_nesting_level();
	}

	fn main_loop(&mut self, lsg: &mut LSG) {
		fn min(a: Option<usize>, b: Option<usize>) -> usize {
			a.unwrap().min(b.unwrap())
		}

		let cfg = self.cfg;
		while let Some(frame) = self.frame_stack.pop() {
			match frame {
				Frame::Enter(u) => {
					if self.dfs[u].is_some() {
						continue;
					}
					self.dfs[u] = Some(self.next_dfs_order);
					self.low[u] = Some(self.next_dfs_order);
					self.next_dfs_order += 1;
					self.in_stack[u] = true;
					self.block_stack.push(u);
					self.frame_stack.push(Frame::Settle(u));
					for &v in cfg.node(u).succs.iter() {
						if self.dfs[v].is_none() {
							// tree edge, lowlink folded in after the subtree
							self.frame_stack.push(Frame::Lowlink(u, v));
							self.frame_stack.push(Frame::Enter(v));
						} else if self.in_stack[v] {
							// back edge
							self.low[u] = Some(min(self.low[u], self.dfs[v]));
						}
					}
				}
				Frame::Lowlink(u, v) => {
					self.low[u] = Some(min(self.low[u], self.low[v]));
				}
				Frame::Settle(u) => {
					if self.dfs[u] == self.low[u] {
						let mut component = Vec::new();
						loop {
							let top = self.block_stack.pop().unwrap();
							self.in_stack[top] = false;
							component.push(top);
							if top == u {
								break;
							}
						}
						self.emit_component(lsg, component);
					}
				}
			}
		}

		assert!(self.block_stack.is_empty());
	}

	fn emit_component(&self, lsg: &mut LSG, component: Vec<BlockId>) {
		let is_loop = component.len() > 1
			|| self.cfg.node(component[0]).has_self_edge();
		if !is_loop {
			return;
		}
		let header = self.find_loop_header(&component);
		let id = lsg.new_loop();
		let slot = lsg.get_mut(id);
		slot.header = Some(header);
		for &bb in component.iter() {
			slot.add_node(bb);
		}
		lsg.add_loop(id);
		trace!(
			"tarjan loop-{} header BB#{:03} size {}",
			id,
			header,
			component.len()
		);
	}

	// A member with a predecessor outside the component; the first
	// popped member when the component subsumes every entry.
	fn find_loop_header(&self, component: &[BlockId]) -> BlockId {
		let members: HashSet<BlockId> = component.iter().copied().collect();
		for &bb in component.iter() {
			let outside =
				self.cfg.node(bb).preds.iter().any(|pred| !members.contains(pred));
			if outside {
				return bb;
			}
		}
		component[0]
	}
}

pub fn find_tarjan_loops(cfg: &CFG, lsg: &mut LSG) -> usize {
	let mut finder = TarjanLoopFinder::new(cfg);
	finder.find_loops(lsg);
	lsg.num_loops()
}
