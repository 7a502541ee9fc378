use std::path::Path;

use anyhow::bail;

use crate::document::PlanDocument;

pub fn init(name: &str, output: &str, force: bool) -> anyhow::Result<()> {
    let output = Path::new(output);
    if output.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", output.display());
    }

    let doc = PlanDocument::scaffold(name);
    std::fs::write(output, doc.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
