pub use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
	#[arg(long)]
	pub dump: bool,

	#[arg(long, default_value_t = 15000)]
	pub dummy_iterations: usize,

	#[arg(long)]
	pub skip_complex: bool,

	#[arg(long)]
	pub skip_scaling: bool,

	#[arg(long, value_delimiter = ',', default_values_t = vec![32usize, 512, 2048])]
	pub scaling_counts: Vec<usize>,

	#[arg(short)]
	pub output: Option<String>,
}
