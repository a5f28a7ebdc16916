pub mod consts;
pub mod error;
pub mod frame;
pub mod stats;
pub mod empty;
pub mod io;
pub mod align;
pub mod stack;
pub mod pipeline;
