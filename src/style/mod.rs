mod box_style;
mod color;
mod layout_state;
mod length;

pub use box_style::*;
pub use color::*;
pub use layout_state::*;
pub use length::*;
