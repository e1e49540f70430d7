//! Linking of parsed regions to reference features by name within the
//! parent's code scope.

mod linker;

pub use linker::{link, LevelStats, LinkReport};
