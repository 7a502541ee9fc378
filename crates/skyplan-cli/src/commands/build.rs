use std::path::Path;

use crate::document;
use crate::registry::BuilderRegistry;

pub fn build(registry: &BuilderRegistry, kind: &str, path: &str) -> anyhow::Result<()> {
    let config = document::read_value(Path::new(path))?;
    let built = registry.build(kind, config)?;
    println!("{}", serde_json::to_string_pretty(&built)?);
    Ok(())
}

pub fn kinds(registry: &BuilderRegistry) -> anyhow::Result<()> {
    let width = registry.kinds().map(|(kind, _)| kind.len()).max().unwrap_or(0);
    for (kind, summary) in registry.kinds() {
        println!("  {kind:<width$}  {summary}");
    }
    Ok(())
}
