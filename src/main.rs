use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use geonet_core::prelude::*;
use tracing_subscriber::EnvFilter;

/// Street network analysis of a GeoJSON line layer
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// GeoJSON file with LineString or MultiLineString features
    #[arg(short, long)]
    input: PathBuf,
    /// Where to write the analysed FeatureCollection
    #[arg(short, long)]
    output: PathBuf,
    /// connectivity, closeness or betweenness
    #[arg(short, long)]
    analysis_type: AnalysisType,
    #[arg(long, default_value_t = ClassificationMethod::default())]
    classification_method: ClassificationMethod,
    #[arg(long, default_value_t = 5)]
    class_count: usize,
    /// Edge cost: euclidean (length) or topological (hops)
    #[arg(long, default_value_t = WeightMode::default())]
    metric: WeightMode,
    /// Search radius in metres or hops, `n` for the whole network
    #[arg(long, default_value = "n")]
    radius: String,
    /// Coordinate distance under which line endpoints share a node, in metres
    #[arg(long)]
    snap_tolerance: Option<f64>,
}

impl Args {
    fn params(&self) -> anyhow::Result<AnalysisParams> {
        let params = AnalysisParams {
            analysis_type: self.analysis_type,
            classification_method: self.classification_method,
            class_count: self.class_count,
            weight_mode: self.metric,
            radius: parse_radius(&self.radius)?,
        };
        params.validate()?;
        Ok(params)
    }

    fn builder_config(&self) -> GraphBuilderConfig {
        let mut config = GraphBuilderConfig::default();
        if let Some(tolerance) = self.snap_tolerance {
            config.snap_tolerance = tolerance;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = args.params()?;

    let features = read_feature_set(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    tracing::info!(
        "read {} features ({}) from {}",
        features.len(),
        features.crs,
        args.input.display()
    );

    let output =
        run_network_analysis_with(&features, &params, &args.builder_config(), &SphericalMercator)
            .context("analysis failed")?;

    let written = write_feature_collection(&output.collection, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let summary = output.summary;
    println!(
        "{}: {} features, {} segments, {} nodes, {} edges -> {} features written to {}",
        params.analysis_type,
        summary.features,
        summary.segments,
        summary.nodes,
        summary.edges,
        written,
        args.output.display()
    );

    let legend = &output.classification;
    println!(
        "{} classes ({}), upper bounds: {}",
        legend.k,
        legend.method,
        serde_json::to_string(&legend.bins)?
    );

    Ok(())
}
