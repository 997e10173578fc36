//! Collection of ready-made, composable generator bodies.
//!
//! Bodies can be driven on their own through a [`Generator`], or
//! embedded in bigger bodies thanks to their generic `step` function.
//!
//! [`Generator`]: crate::generator::Generator

pub mod sequence;
