use std::sync::Arc;

use anyhow::{ Context, Result };
use tokio::sync::watch;
use tracing::{ error, info, warn };

use crate::{
    app::{ build_runtime, discover_engine },
    config::Config,
    exchange::stream::{ connection_groups, BookTickerClient },
    utils::console::{
        print_app_started,
        print_app_starting,
        print_config,
        print_triangles,
        render_results,
        run_report_task,
    },
};

pub fn run_normal_mode(config: Config) -> Result<()> {
    print_app_starting();
    print_config(&config);

    let rt = build_runtime()?;

    let engine = Arc::new(discover_engine(&rt, &config)?);

    if engine.triangles().is_empty() {
        warn!("No triangles found. Check TAD_TARGET_ASSETS and TAD_MAX_PAIRS.");
        println!("No triangles found for the configured target assets, nothing to monitor.");
        return Ok(());
    }

    print_triangles(engine.triangles());

    let symbols = engine.subscription_symbols();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    ctrlc
        ::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        })
        .context("Error setting Ctrl-C handler")?;

    rt.block_on(async {
        let (sink, evaluator) = engine.spawn_evaluator();

        let reporter = tokio::spawn(
            run_report_task(Arc::clone(&engine), config.report_interval(), shutdown_rx.clone())
        );

        let stats = {
            let engine = Arc::clone(&engine);
            let shutdown = shutdown_rx.clone();
            let period = config.stats_interval();
            tokio::spawn(async move { engine.run_stats_task(period, shutdown).await })
        };

        print_app_started();
        info!("\nPress Ctrl+C to exit");

        let groups = connection_groups(&symbols);
        if groups.len() > 1 {
            info!("Spreading {} streams over {} connections", symbols.len(), groups.len());
        }

        let streams: Vec<_> = groups
            .into_iter()
            .map(|group| {
                let client = BookTickerClient::new(config.testnet);
                let shutdown = shutdown_rx.clone();
                let delay = config.reconnect_delay();
                let sink = sink.clone();
                tokio::spawn(async move {
                    client.run_with_reconnect(&group, delay, shutdown, move |tick| sink.push(tick)).await
                })
            })
            .collect();
        drop(sink);

        for stream in streams {
            if let Err(e) = stream.await {
                error!("Market data task failed: {}", e);
            }
        }

        // Every sink went down with its stream, the evaluator drains what is queued
        if let Err(e) = evaluator.await {
            error!("Evaluation task failed: {}", e);
        }

        for handle in [reporter, stats] {
            if let Err(e) = handle.await {
                error!("Background task failed: {}", e);
            }
        }
    });

    println!("{}", render_results(&engine.results().snapshot()));

    info!("Triangular arbitrage detector stopped");
    Ok(())
}
