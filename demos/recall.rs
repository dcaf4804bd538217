use clap::Parser;
use faer::Mat;
use knn_forest_rs::synthetic::generate_clustered_data;
use knn_forest_rs::*;
use std::time::Instant;
use thousands::*;

/// Build an approximate k-NN graph on synthetic clustered data and report
/// recall against exhaustive ground truth.
#[derive(Parser, Debug)]
#[command(about = "kNN graph recall benchmark on synthetic data")]
struct Cli {
    /// Number of samples to generate
    #[arg(long, default_value_t = 20_000)]
    n_samples: usize,

    /// Embedding dimensionality
    #[arg(long, default_value_t = 16)]
    dim: usize,

    /// Number of Gaussian clusters
    #[arg(long, default_value_t = 10)]
    n_clusters: usize,

    /// Neighbours per point
    #[arg(short, default_value_t = 15)]
    k: usize,

    /// Candidates retained per point after the forest phase
    #[arg(long, default_value_t = 30)]
    threshold: usize,

    /// Number of projection trees
    #[arg(long, default_value_t = 20)]
    n_trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 32)]
    max_recursion: usize,

    /// Neighbourhood-expansion iterations
    #[arg(long, default_value_t = 2)]
    max_iter: usize,

    /// Distance metric: euclidean or cosine
    #[arg(long, default_value = "euclidean")]
    distance: String,

    /// Random seed
    #[arg(long, default_value_t = 10101)]
    seed: u64,

    /// Query points sampled for the recall estimate
    #[arg(long, default_value_t = 1000)]
    recall_samples: usize,
}

fn main() {
    let cli = Cli::parse();

    println!("-----------------------------");
    println!(
        "Generating synthetic data: {} samples, {} dimensions, {} clusters, {} dist.",
        cli.n_samples.separate_with_underscores(),
        cli.dim,
        cli.n_clusters,
        cli.distance
    );
    println!("-----------------------------");

    let data: Mat<f32> =
        generate_clustered_data(cli.n_samples, cli.dim, cli.n_clusters, 1.5, cli.seed);

    let metric = parse_ann_dist(&cli.distance).unwrap_or_default();
    let builder = KnnGraphBuilder::new(data.as_ref(), metric);

    println!(
        "Building kNN graph (k={}, threshold={}, {} trees, {} iterations)...",
        cli.k, cli.threshold, cli.n_trees, cli.max_iter
    );
    let progress = Progress::new(
        cli.n_samples * cli.n_trees + cli.n_samples + cli.n_samples * cli.max_iter,
        true,
    );

    let start = Instant::now();
    let knns = builder
        .build(
            cli.k,
            cli.threshold,
            cli.n_trees,
            cli.max_recursion,
            cli.max_iter,
            cli.seed as usize,
            &progress,
        )
        .expect("graph build failed");
    let build_time = start.elapsed().as_secs_f64() * 1000.0;

    println!("Build time: {:.1} ms", build_time);

    println!(
        "Estimating recall over {} sampled points...",
        cli.recall_samples.separate_with_underscores()
    );
    let start = Instant::now();
    let recall = knn_graph_recall(
        &builder,
        &knns,
        Some(cli.recall_samples),
        cli.seed as usize,
    );
    let recall_time = start.elapsed().as_secs_f64() * 1000.0;

    println!("-----------------------------");
    println!("Recall@{}: {:.4}", cli.k, recall);
    println!(
        "Ground truth time: {:.1} ms ({} queries)",
        recall_time,
        cli.recall_samples.separate_with_underscores()
    );
}
