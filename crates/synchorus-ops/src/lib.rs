//! Non-destructive quarantine for synchorus.
//!
//! Discarded duplicates are never deleted. They are moved into a holding
//! directory under their base filename so they can be recovered by hand.
//! Moves run sequentially; a failed move leaves the source untouched and
//! does not stop the batch.

mod conflict;
mod quarantine;

pub use conflict::{CollisionPolicy, ConflictKind, auto_rename_path};
pub use quarantine::{Quarantine, QuarantineError, RelocationReport};
