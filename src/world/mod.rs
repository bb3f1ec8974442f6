pub mod collision;
pub mod generator;
pub mod level;
pub mod state;
