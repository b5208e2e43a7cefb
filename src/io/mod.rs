pub mod image;
pub mod replay;

pub use replay::{RecordedSession, ReplayArbitraryEngine, ReplayImageEngine};
