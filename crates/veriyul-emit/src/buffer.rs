use crate::emitter::EmitContext;

/// String-backed code writer. Writing to memory cannot fail, so unlike [`ReportWriter`]
/// nothing here returns a `Result`.
///
/// [`ReportWriter`]: crate::ReportWriter
#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    out: String,
    context: EmitContext,
}

impl CodeBuffer {
    pub fn new(context: EmitContext) -> Self {
        Self {
            out: String::new(),
            context,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(&self.context.prefix());
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `header {` and indents. An empty header opens a bare block.
    pub fn open(&mut self, header: impl AsRef<str>) {
        match header.as_ref() {
            "" => self.line("{"),
            header => self.line(format!("{} {{", header)),
        }
        self.context.indent();
    }

    pub fn close(&mut self) {
        self.context.dedent();
        self.line("}");
    }

    /// Closes the current block and opens the next on the same line, as in `} else {` or
    /// the sections of a Yul `for` header.
    pub fn reopen(&mut self, text: impl AsRef<str>) {
        self.context.dedent();
        self.line(text);
        self.context.indent();
    }

    /// An empty buffer sharing this one's indent style, starting at level 0.
    pub fn scratch(&self) -> Self {
        Self::new(self.context.detached())
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn block<F>(&mut self, header: impl AsRef<str>, body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.open(header);
        body(self);
        self.close();
    }

    /// Appends pre-rendered text, re-indenting each of its lines at the current level.
    pub fn embed(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}
