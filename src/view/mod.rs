mod builder;
mod typed_array;

pub use builder::ViewBuilder;
pub use typed_array::{TypedArray, TypedArrayKind, ViewPolicy};
