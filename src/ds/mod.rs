pub mod interner;
pub mod intrusive_list;
pub mod slot_arena;

pub use interner::KeyInterner;
pub use intrusive_list::{SlotLinks, SlotLinksIter};
pub use slot_arena::{SlotArena, SlotId};
