pub mod bulk;
pub mod migrate;
pub mod preview;
