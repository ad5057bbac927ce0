mod pointer;
mod store;
mod template;

#[cfg(test)]
pub use pointer::PointerConfig;
pub use store::{ConfigStore, WriteOutcome};
