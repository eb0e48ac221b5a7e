//! Synthetic CFG shapes for the benchmark driver and the engine tests.
//!
//! The diamond arithmetic produces a few parallel edges and merge-node
//! self-edges, so the recognizers see those cases on every run.

use crate::basicblock::BlockId;
use crate::cfg::CFG;

pub fn build_connect(cfg: &mut CFG, start: BlockId, end: BlockId) {
	cfg.add_edge(start, end);
}

pub fn build_diamond(cfg: &mut CFG, start: BlockId) -> BlockId {
	let bb0 = start;
	cfg.add_edge(bb0, bb0 + 1);
	cfg.add_edge(bb0, bb0 + 2);
	cfg.add_edge(bb0 + 1, bb0 + 3);
	cfg.add_edge(bb0 + 2, bb0 + 3);
	bb0 + 3
}

pub fn build_straight(cfg: &mut CFG, start: BlockId, n: usize) -> BlockId {
	for i in 0..n {
		build_connect(cfg, start + i, start + i + 1);
	}
	start + n
}

/// A loop body of two diamonds with an inner back edge, closed by a back
/// edge from the footer to `from`, followed by a one-block tail.
pub fn build_base_loop(cfg: &mut CFG, from: BlockId) -> BlockId {
	let header = build_straight(cfg, from, 1);
	let diamond1 = build_diamond(cfg, header);
	let d11 = build_straight(cfg, diamond1, 1);
	let diamond2 = build_diamond(cfg, d11);
	let footer = build_straight(cfg, diamond2, 1);
	build_connect(cfg, diamond2, d11);
	build_connect(cfg, diamond1, header);
	build_connect(cfg, footer, from);
	build_straight(cfg, footer, 1)
}

/// Two-level counted loop: an inner two-block body with its own back
/// edge, inside an outer loop closed at the outer header.
pub fn build_nested_loop(cfg: &mut CFG, from: BlockId) -> BlockId {
	let outer_header = build_straight(cfg, from, 1);
	let inner_header = build_straight(cfg, outer_header, 1);
	let inner_body = build_straight(cfg, inner_header, 2);
	build_connect(cfg, inner_body, inner_header);
	let outer_tail = build_straight(cfg, inner_body, 1);
	build_connect(cfg, outer_tail, outer_header);
	build_straight(cfg, outer_tail, 1)
}

/// A `while (true)` body with one break path and one continue-or-break
/// path, both landing on a common merge block.
pub fn build_multiple_exit_loop(cfg: &mut CFG, from: BlockId) -> BlockId {
	let header = build_straight(cfg, from, 1);
	let if_node = build_diamond(cfg, header);
	let exit1 = build_straight(cfg, if_node, 1);
	let path2 = build_straight(cfg, if_node, 2);
	build_connect(cfg, path2, header);
	let merge = build_straight(cfg, exit1, 1);
	build_connect(cfg, path2, merge);
	merge
}

pub fn build_sequential_loops(cfg: &mut CFG, from: BlockId) -> BlockId {
	let loop1 = build_base_loop(cfg, from);
	build_base_loop(cfg, loop1)
}

/// A loop whose body branches through two diamond shapes before the
/// back edge.
pub fn build_loop_with_branches(cfg: &mut CFG, from: BlockId) -> BlockId {
	let header = build_straight(cfg, from, 1);
	let branch = build_diamond(cfg, header);
	let path1 = build_straight(cfg, branch, 2);
	let path2 = build_diamond(cfg, branch);
	let merge = build_straight(cfg, path1, 1);
	build_connect(cfg, path2, merge);
	build_connect(cfg, merge, header);
	build_straight(cfg, merge, 1)
}

pub fn build_varied_scc(
	cfg: &mut CFG,
	from: BlockId,
	kind: usize,
) -> BlockId {
	match kind % 5 {
		0 => build_base_loop(cfg, from),
		1 => build_nested_loop(cfg, from),
		2 => build_multiple_exit_loop(cfg, from),
		3 => build_sequential_loops(cfg, from),
		4 => build_loop_with_branches(cfg, from),
		_ => unreachable!(),
	}
}

/// Chains `num_sccs` varied loop shapes, insulated from each other by a
/// gap node, starting at a fresh block 0.
pub fn build_scalable_sccs(cfg: &mut CFG, num_sccs: usize) -> BlockId {
	cfg.create_node(0);
	let mut current = 0;
	for i in 0..num_sccs {
		current = build_varied_scc(cfg, current, i);
		if i + 1 < num_sccs {
			let next = current + 1;
			cfg.create_node(next);
			build_connect(cfg, current, next);
			current = next;
		}
	}
	current
}

/// Strongly connected components produced by `build_scalable_sccs`: one
/// per shape, except the sequential shape which contributes two.
pub fn expected_scc_count(num_sccs: usize) -> usize {
	(0..num_sccs).map(|i| if i % 5 == 3 { 2 } else { 1 }).sum()
}
