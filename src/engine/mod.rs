pub mod crossing;
pub mod normalize;
pub mod outcome;

pub use crossing::{cross_transactions, CrossingOutput};
pub use outcome::review_outcome;
