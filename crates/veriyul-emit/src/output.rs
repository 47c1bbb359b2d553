use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    Compact,
    #[default]
    Pretty,
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn to_string<T>(value: &T, style: OutputStyle) -> serde_json::Result<String>
    where
        T: Serialize + ?Sized,
    {
        match style {
            OutputStyle::Pretty => serde_json::to_string_pretty(value),
            OutputStyle::Compact => serde_json::to_string(value),
        }
    }

    pub fn write<W: Write, T: Serialize + ?Sized>(
        writer: &mut W,
        value: &T,
        style: OutputStyle,
    ) -> Result<()> {
        match style {
            OutputStyle::Pretty => serde_json::to_writer_pretty(&mut *writer, value)?,
            OutputStyle::Compact => serde_json::to_writer(&mut *writer, value)?,
        }
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_styles() {
        let value = json!({"name": "f"});
        assert_eq!(
            JsonFormatter::to_string(&value, OutputStyle::Compact).unwrap(),
            r#"{"name":"f"}"#
        );
        assert!(JsonFormatter::to_string(&value, OutputStyle::Pretty)
            .unwrap()
            .contains("\n  \"name\": \"f\""));
    }

    #[test]
    fn test_write_appends_newline() {
        let mut buffer = Vec::new();
        JsonFormatter::write(&mut buffer, &json!([1, 2]), OutputStyle::Compact).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[1,2]\n");
    }
}
