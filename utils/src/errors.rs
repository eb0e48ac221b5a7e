use thiserror::Error;

#[derive(Error, Debug)]
pub enum LooprecError {
	#[error("system error: {0}")]
	SystemError(String),
}

pub fn map_sys_err(e: std::io::Error) -> LooprecError {
	LooprecError::SystemError(e.to_string())
}
