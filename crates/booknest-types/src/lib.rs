pub mod claim;
pub mod utils;
