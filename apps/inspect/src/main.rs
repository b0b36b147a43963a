// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! KML-Lite Inspect - load a KML file and summarize its entities.
//!
//! ```text
//! kml-inspect <file.kml | file:// url> [--json]
//! ```
//!
//! External style documents are read from disk relative to the loaded file.
//! `KML_BASE_URI` and `KML_MAX_EXTERNAL_DEPTH` configure the loader,
//! `RUST_LOG` the log output.

use anyhow::{bail, Context};
use kml_lite_core::{FileFetcher, KmlDataSource, LoaderConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,kml_lite_core=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut json = false;
    let mut location = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            _ => location = Some(arg),
        }
    }
    let location = location.context("usage: kml-inspect <file.kml> [--json]")?;

    let config = LoaderConfig::from_env();
    tracing::info!(
        location = %location,
        max_external_depth = config.max_external_depth,
        "Starting KML-Lite Inspect"
    );

    let mut source = KmlDataSource::with_config(FileFetcher::new(), config);
    let handle = source
        .load_url(&location)
        .await
        .with_context(|| format!("failed to load {}", location))?;

    if json {
        let entities: Vec<_> = source.entities().iter().collect();
        println!("{}", serde_json::to_string_pretty(&entities)?);
        return Ok(());
    }

    println!(
        "{} entities, {} styles, {} external documents",
        handle.entity_count, handle.style_count, handle.external_documents
    );
    for entity in source.entities() {
        let kind = entity
            .geometry_kind()
            .map(|kind| kind.as_str())
            .unwrap_or("-");
        let vertices = entity.vertex_positions().map_or(0, <[_]>::len);
        println!(
            "{:<40} {:<11} {:>6} {}",
            entity.id(),
            kind,
            vertices,
            entity.name.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
