//! Image model: shared pixel buffers, ROI views and borrowed row access.
pub mod border;
pub mod buffer;
pub mod io;
pub mod rect;
pub mod traits;
pub mod u8;

pub use self::border::BorderPolicy;
pub use self::buffer::{Image, PixelFormat};
pub use self::rect::Rect;
pub use self::traits::{ImageView, ImageViewMut, Rows};
pub use self::u8::{ImageU8, ImageU8Mut};
