pub mod align;
pub mod all_pairs;
pub mod command;
pub mod scoring;
