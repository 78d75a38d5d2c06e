use anyhow::Result;
use colored::*;
use tracing::info;

use crate::{
    app::{ build_runtime, discover_engine },
    config::Config,
    exchange::stream::{ connection_groups, stream_names },
    models::triangle::ClosingLeg,
    utils::console::print_config,
};

/// Print every triangle and the stream list for the current catalog, then exit
pub fn run_discover_mode(config: Config) -> Result<()> {
    print_config(&config);

    let rt = build_runtime()?;
    let engine = discover_engine(&rt, &config)?;

    println!("{} {}", "Triangles:".bold(), engine.triangles().len());
    for (i, triangle) in engine.triangles().iter().enumerate() {
        let orientation = match triangle.orientation() {
            ClosingLeg::Direct => "direct",
            ClosingLeg::Inverted => "inverted",
        };
        println!("{:5}. {} ({} closing leg)", i + 1, triangle, orientation);
    }

    let symbols = engine.subscription_symbols();
    let streams = stream_names(&symbols);
    println!(
        "\n{} {} over {} connection(s)",
        "Streams:".bold(),
        streams.len(),
        connection_groups(&symbols).len()
    );
    for stream in &streams {
        println!("  {}", stream);
    }

    info!("Discovery finished: {} triangles, {} streams", engine.triangles().len(), streams.len());

    Ok(())
}
