// Scancodegen Source Writer
// Line-oriented text builder with an explicit indent stack

/// Builds generated source one logical statement per call
#[derive(Debug, Clone)]
pub struct SourceWriter {
    out: String,
    indent_unit: &'static str,
    depth: usize,
}

impl SourceWriter {
    pub fn new(indent_unit: &'static str) -> Self {
        Self {
            out: String::new(),
            indent_unit,
            depth: 0,
        }
    }

    /// Writer indenting with four spaces
    pub fn spaces() -> Self {
        Self::new("    ")
    }

    /// Writer indenting with tabs
    pub fn tabs() -> Self {
        Self::new("\t")
    }

    /// Write one line at the current indent
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(self.indent_unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    /// Write a line and indent everything after it
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Dedent, then write a closing line
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(text)
    }

    /// Write a line one level out, keeping the current indent (`} else {`)
    pub fn reopen(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.close(text);
        self.depth += 1;
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn finish(self) -> String {
        self.out
    }
}
