use std::path::Path;

use anyhow::bail;

use crate::document::PlanDocument;
use crate::report::{self, ValidationReport};

pub fn check(path: &str, format: &str) -> anyhow::Result<()> {
    let report = run(Path::new(path))?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("{}", report::format_report(&report));
        }
    }

    if !report.is_valid() {
        bail!("{} section(s) of {path} failed validation", report.failures().count());
    }
    Ok(())
}

fn run(path: &Path) -> anyhow::Result<ValidationReport> {
    let doc = PlanDocument::from_file(path)?;
    if doc.is_empty() {
        tracing::warn!(path = %path.display(), "plan document has no sections");
    }
    Ok(report::validate(&doc, &path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_scaffold_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyplan.toml");
        std::fs::write(&path, PlanDocument::scaffold("shop").to_toml_string().unwrap()).unwrap();
        assert!(check(path.to_str().unwrap(), "json").is_ok());
    }

    #[test]
    fn test_check_fails_on_invalid_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyplan.json");
        std::fs::write(&path, r#"{"capacity": {"minimum": 4, "maximum": 2, "default": 3}}"#)
            .unwrap();

        let report = run(&path).unwrap();
        assert_eq!(report.failures().count(), 1);

        let err = check(path.to_str().unwrap(), "text").unwrap_err();
        assert!(err.to_string().contains("1 section(s)"));
    }

    #[test]
    fn test_check_missing_file() {
        assert!(check("/nonexistent/skyplan.toml", "text").is_err());
    }
}
