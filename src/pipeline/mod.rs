pub mod atomic;
pub mod batch;
pub mod classify;
pub mod extraction;
pub mod fields;
pub mod geocode;
pub mod normalize;
pub mod validate;
