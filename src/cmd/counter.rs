use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use slideprint::counter::parse_counter;
use slideprint::page::SnapshotPage;
use slideprint::site::SiteRouter;

pub fn cmd_counter(text: &str) -> Result<()> {
    let Some(count) = parse_counter(Some(text)) else {
        bail!("no slide counter in {text:?}");
    };
    println!("{} / {}", count.current, count.total);
    Ok(())
}

pub async fn cmd_counts(html: &Path, url: &str) -> Result<()> {
    let content = tokio::fs::read_to_string(html)
        .await
        .with_context(|| format!("failed to read {}", html.display()))?;

    let router = SiteRouter::new()?;
    let page = Arc::new(SnapshotPage::new(url, content));
    let Some(adapter) = router.adapter_for(page) else {
        bail!("no site adapter for {url}");
    };

    match adapter.counts() {
        Some(count) => {
            println!("{}: slide {} of {}", adapter.name(), count.current, count.total);
            Ok(())
        }
        None => bail!(
            "{}: counter unreadable in {} (current {}, total {})",
            adapter.name(),
            html.display(),
            adapter.current(),
            adapter.total()
        ),
    }
}
