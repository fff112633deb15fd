//! TeX to `MathML` through `latex2mathml`

use super::math::{MathError, MathRenderer};
use latex2mathml::{latex_to_mathml, DisplayStyle};

/// Default math renderer producing `MathML` markup
#[derive(Debug, Default, Clone, Copy)]
pub struct TexRenderer;

impl MathRenderer for TexRenderer {
    fn render(&self, expr: &str, display: bool) -> Result<String, MathError> {
        let style = if display {
            DisplayStyle::Block
        } else {
            DisplayStyle::Inline
        };
        latex_to_mathml(expr, style).map_err(|e| MathError::new(expr, e.to_string()))
    }
}
