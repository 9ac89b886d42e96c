pub mod cma;
pub mod listing;
pub mod matching;
