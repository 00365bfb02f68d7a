//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Stylesheet for CLI output. Plain until [`Styles::colorize`] is called.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub dim: Style,
    /// Secrets printed for copy/paste (tokens)
    pub secret: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.secret = Style::new().bold();
    }
}
