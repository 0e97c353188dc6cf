//! Song editing for chromatracker.
//!
//! Every change to a song goes through an [`Operation`], so it can be
//! undone. The [`Undoer`] keeps the history and the [`Editor`] turns cursor
//! movement and note input into operations.

mod editor;
mod operation;
pub mod ops;
mod undoer;

pub use editor::Editor;
pub use operation::{OpTarget, Operation, SongOp};
pub use undoer::Undoer;
