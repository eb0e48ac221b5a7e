pub mod fwbw;
pub mod tarjan;

pub use fwbw::find_fwbw_loops;
pub use tarjan::find_tarjan_loops;
