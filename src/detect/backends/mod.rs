pub mod fixed;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use fixed::FixedOutputBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
