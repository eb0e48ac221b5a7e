use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use log::trace;
use rayon::Scope;

use flowgraph::basicblock::BlockId;
use flowgraph::cfg::CFG;
use flowgraph::lsg::{LoopId, LSG};

/// Partitions larger than this are handed to the thread pool; smaller
/// ones are processed inline.
const PARALLEL_THRESHOLD: usize = 50;

/// Forward/backward-trim SCC decomposition. Each recursion trims away
/// acyclic prefix and suffix material, extracts the component around a
/// minimum-id pivot, and recurses on the three disjoint remainders,
/// spawning large ones as independent tasks.
pub struct FwbwLoopFinder<'a> {
	cfg: &'a CFG,
	lsg: Mutex<&'a mut LSG>,
	node_loop: Mutex<HashMap<BlockId, LoopId>>,
}

impl<'a> FwbwLoopFinder<'a> {
	pub fn new(cfg: &'a CFG, lsg: &'a mut LSG) -> Self {
		Self {
			cfg,
			lsg: Mutex::new(lsg),
			node_loop: Mutex::new(HashMap::new()),
		}
	}

	pub fn find_loops(&self) {
		if self.cfg.start_block().is_none() {
			return;
		}
		let working: BTreeSet<BlockId> =
			self.cfg.blocks().map(|(id, _)| id).collect();
		// the scope is the completion barrier: every spawned partition
		// finishes before nesting levels are computed
		rayon::scope(|scope| self.find_loops_recursive(scope, working));
		self.lsg.lock().unwrap().calculate_nesting_level();
	}

	fn find_loops_recursive<'s>(
		&'s self,
		scope: &Scope<'s>,
		nodes: BTreeSet<BlockId>,
	) {
		if nodes.len() <= 1 {
			// a lone block still counts when it loops back to itself
			if let Some(&bb) = nodes.iter().next() {
				if self.cfg.node(bb).has_self_edge() {
					self.emit_scc(&nodes);
				}
			}
			return;
		}

		let remaining = self.trim_forward(nodes);
		if remaining.is_empty() {
			return;
		}
		let remaining = self.trim_backward(remaining);
		if remaining.is_empty() {
			return;
		}

		let pivot = *remaining.iter().next().unwrap();
		let desc = self.reachable(pivot, &remaining, true);
		let pred = self.reachable(pivot, &remaining, false);
		let scc: BTreeSet<BlockId> =
			pred.intersection(&desc).copied().collect();

		let pred_rest: BTreeSet<BlockId> =
			pred.difference(&scc).copied().collect();
		let desc_rest: BTreeSet<BlockId> =
			desc.difference(&scc).copied().collect();
		let touched: BTreeSet<BlockId> = pred.union(&desc).copied().collect();
		let rest: BTreeSet<BlockId> =
			remaining.difference(&touched).copied().collect();

		for part in [pred_rest, desc_rest, rest] {
			if part.len() > PARALLEL_THRESHOLD {
				scope.spawn(move |scope| self.find_loops_recursive(scope, part));
			} else if !part.is_empty() {
				self.find_loops_recursive(scope, part);
			}
		}

		if scc.len() > 1 || self.cfg.node(pivot).has_self_edge() {
			self.emit_scc(&scc);
		}
	}

	/// Strips blocks with no predecessor inside the set, to a fixpoint.
	fn trim_forward(&self, mut nodes: BTreeSet<BlockId>) -> BTreeSet<BlockId> {
		loop {
			let dead: Vec<BlockId> = nodes
				.iter()
				.filter(|&&bb| {
					!self.cfg.node(bb).preds.iter().any(|p| nodes.contains(p))
				})
				.copied()
				.collect();
			if dead.is_empty() {
				return nodes;
			}
			for bb in dead {
				nodes.remove(&bb);
			}
		}
	}

	/// Strips blocks with no successor inside the set, to a fixpoint.
	fn trim_backward(
		&self,
		mut nodes: BTreeSet<BlockId>,
	) -> BTreeSet<BlockId> {
		loop {
			let dead: Vec<BlockId> = nodes
				.iter()
				.filter(|&&bb| {
					!self.cfg.node(bb).succs.iter().any(|s| nodes.contains(s))
				})
				.copied()
				.collect();
			if dead.is_empty() {
				return nodes;
			}
			for bb in dead {
				nodes.remove(&bb);
			}
		}
	}

	/// Blocks of `nodes` reachable from `start` along successor edges
	/// (forward) or predecessor edges, never leaving `nodes`.
	fn reachable(
		&self,
		start: BlockId,
		nodes: &BTreeSet<BlockId>,
		forward: bool,
	) -> BTreeSet<BlockId> {
		let mut visited = BTreeSet::new();
		let mut stack = vec![start];
		while let Some(bb) = stack.pop() {
			if !visited.insert(bb) {
				continue;
			}
			let block = self.cfg.node(bb);
			let next = if forward { &block.succs } else { &block.preds };
			for &n in next.iter() {
				if nodes.contains(&n) && !visited.contains(&n) {
					stack.push(n);
				}
			}
		}
		visited
	}

	/// Emits one loop for `scc`. A member already claimed by an earlier
	/// loop nests that loop inside this one instead of being added
	/// twice. The forest lock is never held while the association map
	/// lock is taken, and vice versa.
	fn emit_scc(&self, scc: &BTreeSet<BlockId>) {
		let loop_id = self.lsg.lock().unwrap().new_loop();
		let header = self.find_loop_header(scc);

		let mut fresh = Vec::new();
		let mut inner = Vec::new();
		{
			let mut node_loop = self.node_loop.lock().unwrap();
			for &bb in scc.iter() {
				match node_loop.get(&bb) {
					Some(&prior) => inner.push(prior),
					None => {
						node_loop.insert(bb, loop_id);
						fresh.push(bb);
					}
				}
			}
		}

		let mut lsg = self.lsg.lock().unwrap();
		let slot = lsg.get_mut(loop_id);
		slot.header = Some(header);
		for bb in fresh {
			slot.add_node(bb);
		}
		for child in inner {
			if child != loop_id {
				lsg.set_parent(child, loop_id);
			}
		}
		lsg.add_loop(loop_id);
		trace!(
			"fwbw loop-{} header BB#{:03} size {}",
			loop_id,
			header,
			scc.len()
		);
	}

	fn find_loop_header(&self, scc: &BTreeSet<BlockId>) -> BlockId {
		for &bb in scc.iter() {
			let outside =
				self.cfg.node(bb).preds.iter().any(|pred| !scc.contains(pred));
			if outside {
				return bb;
			}
		}
		*scc.iter().next().unwrap()
	}
}

pub fn find_fwbw_loops(cfg: &CFG, lsg: &mut LSG) -> usize {
	{
		let finder = FwbwLoopFinder::new(cfg, lsg);
		finder.find_loops();
	}
	lsg.num_loops()
}

#[cfg(test)]
mod tests {
	use flowgraph::synth;

	use super::*;

	fn graph(edges: &[(BlockId, BlockId)]) -> CFG {
		let mut cfg = CFG::new();
		for &(u, v) in edges {
			cfg.add_edge(u, v);
		}
		cfg
	}

	fn sorted_members(lsg: &LSG) -> Vec<Vec<BlockId>> {
		let mut members: Vec<Vec<BlockId>> = lsg
			.loops()
			.map(|(_, l)| l.members.iter().copied().collect())
			.collect();
		members.sort();
		members
	}

	#[test]
	fn empty_cfg_yields_no_loops() {
		let cfg = CFG::new();
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 0);
	}

	#[test]
	fn lone_block_without_self_edge_is_no_loop() {
		let mut cfg = CFG::new();
		cfg.create_node(0);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 0);
	}

	#[test]
	fn lone_self_edge_is_recognized() {
		let cfg = graph(&[(0, 0)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		let (_, l) = lsg.loops().next().unwrap();
		assert_eq!(l.members.iter().copied().collect::<Vec<_>>(), vec![0]);
	}

	#[test]
	fn self_edge_behind_a_chain_is_recognized() {
		let cfg = graph(&[(0, 1), (1, 1)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		assert_eq!(sorted_members(&lsg), vec![vec![1]]);
	}

	#[test]
	fn back_edge_makes_one_loop_with_its_header() {
		let cfg = graph(&[(0, 1), (1, 2), (2, 3), (3, 1)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		let (_, l) = lsg.loops().next().unwrap();
		assert_eq!(l.members.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
		assert_eq!(l.header, Some(1));
	}

	#[test]
	fn inner_cycles_fold_into_the_maximal_component() {
		let cfg =
			graph(&[(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (4, 5)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		assert_eq!(sorted_members(&lsg), vec![vec![1, 2, 3, 4]]);
	}

	#[test]
	fn disjoint_loops_in_series_stay_separate() {
		let cfg = graph(&[
			(0, 1),
			(1, 2),
			(2, 1),
			(2, 3),
			(3, 4),
			(4, 3),
			(4, 5),
			(5, 6),
			(6, 7),
		]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 2);
		assert_eq!(sorted_members(&lsg), vec![vec![1, 2], vec![3, 4]]);
		for (_, l) in lsg.loops() {
			assert_eq!(l.parent, None);
			assert_eq!(l.level, 0);
		}
	}

	#[test]
	fn every_block_is_seeded_even_without_a_path_from_start() {
		// unlike the start-rooted engine, the working set covers islands
		let cfg = graph(&[(0, 1), (5, 6), (6, 5)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		assert_eq!(sorted_members(&lsg), vec![vec![5, 6]]);
	}

	#[test]
	fn parallel_partitions_find_every_component() {
		let mut cfg = CFG::new();
		synth::build_scalable_sccs(&mut cfg, 40);
		let mut lsg = LSG::new();
		assert_eq!(
			find_fwbw_loops(&cfg, &mut lsg),
			synth::expected_scc_count(40)
		);
	}

	#[test]
	fn emission_nests_previously_claimed_blocks() {
		let cfg = graph(&[(0, 1), (1, 0), (1, 2), (2, 1)]);
		let mut lsg = LSG::new();
		{
			let finder = FwbwLoopFinder::new(&cfg, &mut lsg);
			let inner: BTreeSet<BlockId> = [0, 1].into_iter().collect();
			finder.emit_scc(&inner);
			let outer: BTreeSet<BlockId> = [0, 1, 2].into_iter().collect();
			finder.emit_scc(&outer);
		}
		lsg.calculate_nesting_level();
		assert_eq!(lsg.num_loops(), 2);
		let loops: Vec<_> = lsg.loops().collect();
		let (_, inner_loop) = loops[0];
		let (outer_id, outer_loop) = loops[1];
		assert_eq!(inner_loop.parent, Some(outer_id));
		assert_eq!(inner_loop.level, 1);
		assert_eq!(outer_loop.level, 0);
		// the outer loop holds only the blocks the inner one left over
		assert_eq!(
			outer_loop.members.iter().copied().collect::<Vec<_>>(),
			vec![2]
		);
	}

	#[test]
	fn repeated_runs_accumulate_in_the_same_forest() {
		let cfg = graph(&[(0, 1), (1, 0)]);
		let mut lsg = LSG::new();
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 1);
		assert_eq!(find_fwbw_loops(&cfg, &mut lsg), 2);
	}

	#[test]
	fn small_graphs_emit_in_a_fixed_sequence() {
		// below the spawn threshold everything runs inline, so the
		// min-id pivot makes the emission order reproducible
		let edges = [
			(0, 1),
			(1, 2),
			(2, 1),
			(2, 3),
			(3, 4),
			(4, 3),
			(4, 5),
			(5, 5),
		];
		let cfg = graph(&edges);
		let mut first = LSG::new();
		find_fwbw_loops(&cfg, &mut first);
		let mut second = LSG::new();
		find_fwbw_loops(&cfg, &mut second);
		let sequence = |lsg: &LSG| -> Vec<Vec<BlockId>> {
			lsg
				.loops()
				.map(|(_, l)| l.members.iter().copied().collect())
				.collect()
		};
		assert_eq!(sequence(&first), sequence(&second));
		assert_eq!(first.num_loops(), 3);
	}
}
