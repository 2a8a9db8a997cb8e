//! Image decoding and encoding.

mod load;
mod save;

pub use load::load_rgb;
pub use save::{save_gray, save_rgba};

pub(crate) use save::{alpha_format, encode_gray, encode_rgba, gray_format, write_staged};
