use std::path::Path;

use anyhow::{Context, Result};

use slideprint::output::render_document;
use slideprint::session::Slide;

pub async fn cmd_assemble(slides: &Path, output: &Path, ratio: f64) -> Result<()> {
    let json = tokio::fs::read_to_string(slides)
        .await
        .with_context(|| format!("failed to read {}", slides.display()))?;
    let slides: Vec<Slide> =
        serde_json::from_str(&json).with_context(|| format!("invalid slide list in {}", slides.display()))?;

    let html = render_document(&slides, ratio);
    tokio::fs::write(output, html.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("💾 Saved {} slide(s) to {}", slides.len(), output.display());
    Ok(())
}
