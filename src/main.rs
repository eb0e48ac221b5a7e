mod cli;

use std::{
	fs::File,
	io::{self, Write},
	time::Instant,
};

use anyhow::Result;
use clap::Parser;
use cli::Args;
use flowgraph::{cfg::CFG, lsg::LSG, synth};
use loopfinder::{find_fwbw_loops, find_tarjan_loops};
use utils::{fatal_error, map_sys_err, warning};

fn build_simple_cfg() -> CFG {
	let mut cfg = CFG::new();
	cfg.create_node(0); // top
	synth::build_base_loop(&mut cfg, 0);
	cfg.create_node(1); // bottom
	cfg.add_edge(0, 2);
	cfg
}

// 10 parallel loop trees of 100 outer loops, each wrapping 25 base
// loops, all fanning out of block 2 and converging on block 1
fn build_complex_cfg(cfg: &mut CFG) {
	let mut n = 2;
	for _ in 0..10 {
		cfg.create_node(n + 1);
		synth::build_connect(cfg, 2, n + 1);
		n += 1;
		for _ in 0..100 {
			let top = n;
			n = synth::build_straight(cfg, n, 1);
			for _ in 0..25 {
				n = synth::build_base_loop(cfg, n);
			}
			let bottom = synth::build_straight(cfg, n, 1);
			synth::build_connect(cfg, n, top);
			n = bottom;
		}
		synth::build_connect(cfg, n, 1);
	}
}

fn run_once(cfg: &CFG, engine: fn(&CFG, &mut LSG) -> usize) -> (LSG, f64) {
	let mut lsg = LSG::new();
	let start = Instant::now();
	engine(cfg, &mut lsg);
	(lsg, start.elapsed().as_secs_f64() * 1e3)
}

fn step_dummy(cfg: &CFG, iterations: usize) {
	let start = Instant::now();
	for _ in 0..iterations {
		find_fwbw_loops(cfg, &mut LSG::new());
	}
	let fwbw = start.elapsed();

	let start = Instant::now();
	for _ in 0..iterations {
		find_tarjan_loops(cfg, &mut LSG::new());
	}
	let tarjan = start.elapsed();

	eprintln!("Per-iteration times over {} runs:", iterations);
	eprintln!(
		"  fwbw:   {:.4} ms",
		fwbw.as_secs_f64() * 1e3 / iterations as f64
	);
	eprintln!(
		"  tarjan: {:.4} ms",
		tarjan.as_secs_f64() * 1e3 / iterations as f64
	);
}

fn step_scaling(counts: &[usize]) {
	eprintln!("=== Scaling component counts ===");
	for &count in counts {
		let mut cfg = CFG::new();
		synth::build_scalable_sccs(&mut cfg, count);
		let expected = synth::expected_scc_count(count);

		let (lsg, ms) = run_once(&cfg, find_fwbw_loops);
		eprintln!(
			"  {} shapes: fwbw found {} loops (expected {}) in {:.2} ms",
			count,
			lsg.num_loops(),
			expected,
			ms
		);
		let (lsg, ms) = run_once(&cfg, find_tarjan_loops);
		eprintln!(
			"  {} shapes: tarjan found {} loops (expected {}) in {:.2} ms",
			count,
			lsg.num_loops(),
			expected,
			ms
		);
	}
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	if args.scaling_counts.iter().any(|&c| c == 0) {
		fatal_error("scaling counts must be positive");
	}
	if args.output.is_some() && !args.dump {
		warning("-o has no effect without --dump");
	}

	let mut writer: Box<dyn Write> = if let Some(o) = &args.output {
		Box::new(File::create(o).map_err(map_sys_err)?)
	} else {
		Box::new(io::stderr())
	};

	eprintln!("Welcome to looprec, the loop recognition benchmark");
	eprintln!("Constructing simple cfg...");
	let mut cfg = build_simple_cfg();
	if args.dump {
		writeln!(writer, "simple control flow graph:")?;
		writeln!(writer, "{}", cfg)?;
	}

	if args.dummy_iterations > 0 {
		eprintln!(
			"{} dummy iterations with both engines",
			args.dummy_iterations
		);
		step_dummy(&cfg, args.dummy_iterations);
	}

	if !args.skip_complex {
		eprintln!("Constructing complex cfg...");
		build_complex_cfg(&mut cfg);
		eprintln!("  {} blocks", cfg.num_nodes());
	}

	eprintln!("Performing loop recognition, 1 iteration with both engines");
	let (fwbw_lsg, fwbw_ms) = run_once(&cfg, find_fwbw_loops);
	let (tarjan_lsg, tarjan_ms) = run_once(&cfg, find_tarjan_loops);
	eprintln!(
		"  fwbw:   {:.2} ms, found {} loops",
		fwbw_ms,
		fwbw_lsg.num_loops()
	);
	eprintln!(
		"  tarjan: {:.2} ms, found {} loops",
		tarjan_ms,
		tarjan_lsg.num_loops()
	);

	if args.dump {
		writeln!(writer, "fwbw loop structure:")?;
		write!(writer, "{}", fwbw_lsg)?;
		writeln!(writer, "tarjan loop structure:")?;
		write!(writer, "{}", tarjan_lsg)?;
	}

	if !args.skip_scaling {
		step_scaling(&args.scaling_counts);
	}

	Ok(())
}
