//! Setting handlers for the configuration keys.

pub mod boolean;
pub mod interests;
pub mod number;
pub mod text;

pub use boolean::*;
pub use interests::*;
pub use number::*;
pub use text::*;
