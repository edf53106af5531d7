mod dispatch;
pub mod event;
pub(crate) mod input;

pub use event::{EventHandler, EventKind, GuiEvent, HandlerId, HandlerList, MouseButton};
