use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tiny_knn::codec::{read_file, read_file_f32_le};
use tiny_knn::eval::{mean_recall, wilson_lower_bound};
use tiny_knn::persist::{save_dir, write_json};
use tiny_knn::seed::select_queries;
use tiny_knn::{
    search_parallel, Effort, IndexHandle, KnnConfig, Matrix, RecordFormat, RecordGeometry,
    ResultHeader, Strategy, TreeParams, GIST_DIMS,
};

#[derive(Clone, Copy, ValueEnum, Debug)]
enum FormatArg { U8, F32le }
impl From<FormatArg> for RecordFormat {
    fn from(f: FormatArg) -> Self { match f { FormatArg::U8 => RecordFormat::U8, FormatArg::F32le => RecordFormat::F32Le } }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum StrategyArg { Linear, Tree }
impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self { match s { StrategyArg::Linear => Strategy::Linear, StrategyArg::Tree => Strategy::Tree } }
}

#[derive(Parser, Debug)]
#[command(name="knn", about="Exact k-nearest-neighbor search over a raw fixed-record file")]
struct Args {
    #[arg(long)] input: PathBuf,
    #[arg(long, value_enum, default_value_t=FormatArg::U8)] format: FormatArg,

    // record geometry (u8 format); --record-width overrides it
    #[arg(long, default_value_t=32)] width: usize,
    #[arg(long, default_value_t=32)] height: usize,
    #[arg(long, default_value_t=3)] channels: usize,
    #[arg(long)] record_width: Option<usize>,

    #[arg(long, value_enum, default_value_t=StrategyArg::Linear)] strategy: StrategyArg,
    #[arg(long, default_value_t=4)] trees: usize,
    #[arg(long, default_value_t=1)] leaf_size: usize,
    #[arg(long, default_value="unbounded")] checks: Effort,
    #[arg(long, default_value_t=10)] k: usize,

    /// Sample this many dataset rows as queries (default: every row).
    #[arg(long)] queries: Option<usize>,
    #[arg(long, default_value_t=1)] seed: u64,
    #[arg(long, default_value_t=1)] threads: usize,

    #[arg(long)] out: Option<PathBuf>,
    #[arg(long)] json: Option<PathBuf>,
    /// Compare against a linear scan and report recall.
    #[arg(long, default_value_t=false)] verify: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> tiny_knn::Result<()> {
    let format: RecordFormat = args.format.into();
    let record_width = match (format, args.record_width) {
        (_, Some(w)) => w,
        (RecordFormat::U8, None) => RecordGeometry { width: args.width, height: args.height, channels: args.channels }.record_width(),
        (RecordFormat::F32Le, None) => GIST_DIMS,
    };
    let cfg = KnnConfig {
        record_width,
        strategy: args.strategy.into(),
        k: args.k,
        effort: args.checks,
        tree: TreeParams { trees: args.trees, leaf_size: args.leaf_size, seed: args.seed },
    };
    cfg.validate()?;

    let t0 = Instant::now();
    let data: Matrix<f32> = match format {
        RecordFormat::U8 => read_file(&args.input, record_width)?,
        RecordFormat::F32Le => read_file_f32_le(&args.input, record_width)?,
    };
    info!(rows = data.rows(), cols = data.cols(), ms = t0.elapsed().as_millis() as u64, "read dataset");

    let query_ids = match args.queries {
        Some(nq) => Some(select_queries(data.rows(), nq, args.seed)?),
        None => None,
    };
    let queries = match &query_ids {
        Some(ids) => data.select_rows(ids)?,
        None => data.clone(),
    };

    let t0 = Instant::now();
    let index = IndexHandle::from_config(&data, &cfg)?;
    info!(strategy = ?index.strategy(), ms = t0.elapsed().as_millis() as u64, "built index");

    let t0 = Instant::now();
    let result = search_parallel(&index, &queries, cfg.k, cfg.effort, args.threads)?;
    let elapsed = t0.elapsed();
    info!(
        queries = result.rows(),
        k = result.k(),
        ms = elapsed.as_millis() as u64,
        qps = result.rows() as f64 / elapsed.as_secs_f64().max(1e-9),
        "search done"
    );

    if args.verify {
        let linear = IndexHandle::build(&data, Strategy::Linear, cfg.tree)?;
        let truth = search_parallel(&linear, &queries, cfg.k, Effort::Unbounded, args.threads)?;
        let (recall, hits, possible) = mean_recall(&truth, &result)?;
        let lb = wilson_lower_bound(hits, possible, 1.96);
        info!(recall, lower_bound = lb, "recall vs linear scan");
    }

    if let Some(path) = &args.json {
        write_json(path, &result, query_ids.as_deref())?;
        info!(path = %path.display(), "wrote json");
    }
    if let Some(dir) = &args.out {
        let header = ResultHeader::new(cfg, format, data.rows(), queries.rows(), query_ids);
        save_dir(dir, &result, &header)?;
    }
    Ok(())
}
