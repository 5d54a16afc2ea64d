use anyhow::{Result, anyhow};
use serde_json::Value;
use std::path::Path;

use super::{Compiler, Factory};

/// Exports the module text itself as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCompiler;

impl Compiler for TextCompiler {
    fn compile(&self, text: &str, path: &Path, _line_offset: usize) -> Result<Factory> {
        let text = Value::String(text.to_string());
        Ok(Factory::new(Some(path.to_path_buf()), move |_| {
            Ok(text.clone())
        }))
    }
}

/// Parses the module text as a JSON document and exports it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCompiler;

impl Compiler for JsonCompiler {
    fn compile(&self, text: &str, path: &Path, line_offset: usize) -> Result<Factory> {
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).map_err(|e| {
                anyhow!(
                    "{}:{}:{}: {}",
                    path.display(),
                    e.line() + line_offset.saturating_sub(1),
                    e.column(),
                    e
                )
            })?
        };
        Ok(Factory::new(Some(path.to_path_buf()), move |_| {
            Ok(value.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Scope;
    use serde_json::json;

    #[test]
    fn test_text_compiler_exports_text() {
        let factory = TextCompiler
            .compile("hello\n", Path::new("/lib/greeting"), 1)
            .unwrap();
        assert_eq!(factory.call(&Scope::new()).unwrap(), json!("hello\n"));
        assert_eq!(factory.path(), Some(Path::new("/lib/greeting")));
    }

    #[test]
    fn test_json_compiler_exports_document() {
        let factory = JsonCompiler
            .compile(r#"{"answer": 42}"#, Path::new("/lib/data.json"), 1)
            .unwrap();
        assert_eq!(factory.call(&Scope::new()).unwrap(), json!({"answer": 42}));
    }

    #[test]
    fn test_json_compiler_reports_file_line() {
        // Line 1 held a shebang that was blanked out
        let err = JsonCompiler
            .compile("\n{\n  \"a\": ,\n}", Path::new("/lib/bad.json"), 1)
            .unwrap_err();
        assert!(err.to_string().starts_with("/lib/bad.json:3:"));
    }
}
