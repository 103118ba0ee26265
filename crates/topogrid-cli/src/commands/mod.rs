pub mod select;
pub mod topology;
