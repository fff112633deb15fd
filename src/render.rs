//! Answer rendering
//!
//! Markdown is re-rendered on every fragment (cheap); math layout runs once
//! per completed message over the rendered HTML (expensive).

mod fragment;
mod markdown;
mod math;
mod tex;

#[cfg(test)]
mod proptests;

pub use fragment::Fragment;
pub use markdown::markdown_to_html;
#[cfg(test)]
pub use math::MathError;
pub use math::{render_math, MathRenderer};
pub use tex::TexRenderer;
