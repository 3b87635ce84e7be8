use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::TaxonomyArgs;
use crate::taxonomy::parse;
use crate::util::write_json_pretty;

pub fn run(args: TaxonomyArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let catalog =
        parse(&raw).with_context(|| format!("failed to parse {}", args.path.display()))?;

    if catalog.is_empty() {
        warn!(path = %args.path.display(), "taxonomy contains no recognizable topics");
    }

    for super_topic in &catalog.super_topics {
        let subs = catalog.sub_topics_for(super_topic);
        info!(
            super_topic = %super_topic,
            sub_topics = subs.len(),
            names = %subs.join(", "),
            "catalog entry"
        );
    }
    info!(
        super_topics = catalog.super_topics.len(),
        sub_topics = catalog.all_sub_topics.len(),
        "parsed topic catalog"
    );

    if let Some(output) = &args.output {
        let sha256 = write_json_pretty(output, &catalog)?;
        info!(path = %output.display(), sha256 = %sha256, "wrote topic catalog");
    }

    Ok(())
}
