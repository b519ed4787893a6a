pub mod assessment;
pub mod common;
pub mod desync;
pub mod ranking;
pub mod reward;
pub mod tournament;
