pub mod buffer;
pub mod limits;
