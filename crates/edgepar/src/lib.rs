#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use edgepar_image as image;

#[doc(inline)]
pub use edgepar_imgproc as imgproc;

#[doc(inline)]
pub use edgepar_io as io;
