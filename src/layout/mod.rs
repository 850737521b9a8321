//! Layout engine — turns absolute musical time into rows ("systems") and
//! pixel positions, and back.

pub mod addressing;
pub mod constants;
pub mod geometry;
pub mod resolver;
pub mod responsive;

pub use addressing::{
    absolute_beat, beat_to_x, from_x_pixel, locate, snap_to_half_beat, RowPosition,
};
pub use geometry::{
    note_head_category, pitch_offset, staff_y, NoteHeadCategory, Pitch, STAFF_CENTER,
};
pub use resolver::{row_for_beat, RowResolver, RowSpan, SystemStartBeats};
pub use responsive::{
    compute_layout, LayoutChange, LayoutConfig, LayoutInputs, LayoutOptions, MeasuresPerRow,
    ResponsiveLayout,
};
