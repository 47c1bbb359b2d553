use crate::config::EmitterConfig;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;

pub type EmitResult = Result<()>;

/// Indentation shared by the Yul [`CodeBuffer`](crate::CodeBuffer) and the
/// [`ReportWriter`].
#[derive(Debug, Clone)]
pub struct EmitContext {
    level: usize,
    unit: String,
    pub use_colors: bool,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::from_config(&EmitterConfig::default())
    }

    pub fn from_config(config: &EmitterConfig) -> Self {
        Self {
            level: 0,
            unit: config.indent_style.to_string(),
            use_colors: config.use_colors,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// The same style at level 0, for text rendered apart and embedded later.
    pub fn detached(&self) -> Self {
        Self {
            level: 0,
            ..self.clone()
        }
    }

    pub fn prefix(&self) -> String {
        self.unit.repeat(self.level)
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a contract report: a title line, then `=== Section ===` headings with indented
/// `key: value` fields under them.
pub struct ReportWriter<W: Write> {
    writer: W,
    context: EmitContext,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, context: EmitContext) -> Self {
        Self { writer, context }
    }

    pub fn title(&mut self, text: &str) -> EmitResult {
        let text = if self.context.use_colors {
            text.green().bold().to_string()
        } else {
            text.to_string()
        };
        writeln!(self.writer, "{}{}", self.context.prefix(), text)?;
        Ok(())
    }

    pub fn section(&mut self, title: &str) -> EmitResult {
        let heading = format!("=== {} ===", title);
        let heading = if self.context.use_colors {
            heading.cyan().to_string()
        } else {
            heading
        };
        writeln!(self.writer)?;
        writeln!(self.writer, "{}{}", self.context.prefix(), heading)?;
        Ok(())
    }

    /// One field, one level below the title and section headings.
    pub fn field(&mut self, key: &str, value: impl AsRef<str>) -> EmitResult {
        let key = if self.context.use_colors {
            key.bold().to_string()
        } else {
            key.to_string()
        };
        let mut nested = self.context.clone();
        nested.indent();
        writeln!(self.writer, "{}{}: {}", nested.prefix(), key, value.as_ref())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;
    use pretty_assertions::assert_eq;

    fn plain() -> EmitContext {
        EmitContext {
            use_colors: false,
            ..EmitContext::new()
        }
    }

    #[test]
    fn test_context_indentation() {
        let mut ctx = EmitContext::new();
        assert_eq!(ctx.prefix(), "");

        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.level(), 2);
        assert_eq!(ctx.prefix(), "    ");
        assert_eq!(ctx.detached().level(), 0);

        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn test_context_from_config() {
        let config = EmitterConfig {
            indent_style: IndentStyle::Tabs,
            use_colors: false,
            ..EmitterConfig::default()
        };
        let mut ctx = EmitContext::from_config(&config);
        ctx.indent();
        assert_eq!(ctx.prefix(), "\t");
        assert!(!ctx.use_colors);
    }

    #[test]
    fn test_report_layout() {
        let mut report = ReportWriter::new(Vec::new(), plain());
        report.title("Contract Vault").unwrap();
        report.field("license", "MIT").unwrap();
        report.section("Storage").unwrap();
        report.field("total", "slot 0 : uint256").unwrap();

        let output = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(
            output,
            "Contract Vault\n  license: MIT\n\n=== Storage ===\n  total: slot 0 : uint256\n"
        );
    }

    #[test]
    fn test_colored_title_keeps_text() {
        let mut report = ReportWriter::new(Vec::new(), EmitContext::new());
        report.title("Contract Vault").unwrap();
        let output = String::from_utf8(report.finish().unwrap()).unwrap();
        assert!(output.contains("Contract Vault"));
    }
}
