pub mod assessments;
pub mod desync;
pub mod skills;
pub mod tournaments;
