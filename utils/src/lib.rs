pub mod errors;

use std::fmt::Display;

pub use errors::*;

pub fn fatal_error(str: impl Display) {
	eprintln!("{}: {}", console::style("fatal error").bold().red(), str);
	std::process::exit(1);
}

pub fn warning(str: impl Display) {
	eprintln!("{}: {}", console::style("warning").bold().magenta(), str);
}
