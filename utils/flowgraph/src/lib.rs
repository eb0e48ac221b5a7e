pub mod basicblock;
pub mod cfg;
pub mod lsg;
pub mod synth;

pub use basicblock::{BasicBlock, BlockId};
pub use cfg::CFG;
pub use lsg::{LoopId, SimpleLoop, LSG};
