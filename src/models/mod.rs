mod playlist;

pub use playlist::*;
