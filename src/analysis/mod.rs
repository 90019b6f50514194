pub mod metrics;
pub mod normalize;
pub mod scorer;
pub mod weights;
