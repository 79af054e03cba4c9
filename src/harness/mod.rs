//! Border/ROI harness: the border × input cross-product and the aliasing
//! scenario where a producer writes through a window the consumer reads.
mod border;
mod roi;

pub use self::border::{border_matrix, defined_interior, BorderCase, ImageSource};
pub use self::roi::{verify_host_aliasing, RoiGraph, RoiScenario};
