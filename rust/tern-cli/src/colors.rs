//! ANSI color helpers for CLI output.

/// Colors output when enabled; passes text through unchanged otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint("32", s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint("31", s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint("33", s)
    }

    pub fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.paint("90", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_palette_passes_text_through() {
        let palette = Palette::plain();
        assert_eq!(palette.red("oops"), "oops");
        assert_eq!(palette.bold(&palette.cyan("x")), "x");
    }

    #[test]
    fn enabled_palette_wraps_in_escape_codes() {
        let palette = Palette::new(true);
        assert_eq!(palette.green("ok"), "\x1b[32mok\x1b[0m");
        assert_eq!(palette.gray("dim"), "\x1b[90mdim\x1b[0m");
    }
}
