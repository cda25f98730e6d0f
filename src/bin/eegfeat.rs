use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eegfeat::clip::{fit_clip_bounds, ClipBounds};
use eegfeat::io::write_assembled;
use eegfeat::scoring::{predict_features, LinearScorer};
use eegfeat::{analyze_file, build_train_test, extract_features_from_file, PipelineConfig};

#[derive(Parser)]
#[command(name = "eegfeat", about = "SMNI EEG spectral feature extraction")]
struct Args {
    /// Force EOG cleaning on (overrides EOG_CLEAN)
    #[arg(long, global = true)]
    eog: bool,

    /// Highpass cutoff before ICA in Hz; <= 0 disables it
    #[arg(long, global = true)]
    eog_highpass: Option<f32>,

    /// Number of ICA components (0 = min(channels, 12))
    #[arg(long, global = true)]
    eog_components: Option<usize>,

    /// |r| above which a component counts as ocular
    #[arg(long, global = true)]
    eog_threshold: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feature set of one CSV file as JSON
    Extract {
        input: PathBuf,
        /// Output JSON path (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Dashboard report of one CSV file as JSON
    Analyze {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Train/test safetensors plus clip bounds from two CSV directories
    Build {
        /// Directory (or single file) of training CSVs
        #[arg(long)]
        train: PathBuf,
        /// Directory (or single file) of test CSVs
        #[arg(long)]
        test: PathBuf,
        /// Output directory
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Score one CSV file with a linear model
    Predict {
        input: PathBuf,
        /// JSON `{"weights": [...], "bias": b}` over the bandpower features
        #[arg(long)]
        model: PathBuf,
        /// bp_clip_bounds.json from `build`
        #[arg(long)]
        bounds: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = config_from(&args)?;

    match &args.command {
        Command::Extract { input, output } => {
            let set = extract_features_from_file(input, &cfg)?;
            info!(
                file = %set.source_file,
                trial = set.trial_number,
                eog_cleaned = set.eog.is_cleaned(),
                eog = ?set.eog,
                "features extracted"
            );
            emit_json(&serde_json::to_string_pretty(&set)?, output.as_deref())?;
        }
        Command::Analyze { input, output } => {
            let report = analyze_file(input, &cfg)?;
            emit_json(&serde_json::to_string_pretty(&report)?, output.as_deref())?;
        }
        Command::Build { train, test, out_dir } => {
            let train_files = csv_files(train)?;
            let test_files = csv_files(test)?;
            info!(train = train_files.len(), test = test_files.len(), "building dataset");

            let bundle = build_train_test(&train_files, &test_files, &cfg)?;
            let (lo_q, hi_q) = cfg.clip_quantiles;
            let bounds = fit_clip_bounds(bundle.train.bp.view(), lo_q, hi_q)?;

            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            write_assembled(&bundle.train, &bundle.schema, &out_dir.join("train.safetensors"))?;
            write_assembled(&bundle.test, &bundle.schema, &out_dir.join("test.safetensors"))?;
            bounds.save(&out_dir.join("bp_clip_bounds.json"))?;
            println!(
                "train {} rows ({} skipped), test {} rows ({} skipped) → {}",
                bundle.train.len(),
                bundle.train.skipped,
                bundle.test.len(),
                bundle.test.skipped,
                out_dir.display()
            );
        }
        Command::Predict { input, model, bounds } => {
            let text = std::fs::read_to_string(model)
                .with_context(|| format!("reading {}", model.display()))?;
            let model: LinearScorer = serde_json::from_str(&text).context("parsing linear model")?;
            let bounds = bounds.as_deref().map(ClipBounds::load).transpose()?;

            let set = extract_features_from_file(input, &cfg)?;
            if model.weights.len() != set.bp_feats.len() {
                bail!(
                    "model has {} weights, file has {} bandpower features",
                    model.weights.len(),
                    set.bp_feats.len()
                );
            }
            let prediction = predict_features(&set, bounds.as_ref(), &model);
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }
    Ok(())
}

fn config_from(args: &Args) -> Result<PipelineConfig> {
    let mut cfg = PipelineConfig::from_env()?;
    if args.eog {
        cfg.eog.enabled = true;
    }
    if let Some(hz) = args.eog_highpass {
        cfg.eog.highpass_hz = Some(hz);
    }
    if let Some(k) = args.eog_components {
        cfg.eog.n_components = k;
    }
    if let Some(r) = args.eog_threshold {
        cfg.eog.corr_threshold = r;
    }
    for band in cfg.validate()? {
        warn!(band = %band, "band covers fewer than two PSD bins; its power will be 0");
    }
    Ok(cfg)
}

/// `.csv` files of a directory in name order, or the path itself.
fn csv_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).with_context(|| format!("listing {}", path.display()))? {
        let p = entry?.path();
        if p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
            files.push(p);
        }
    }
    files.sort();
    if files.is_empty() {
        bail!("no .csv files in {}", path.display());
    }
    Ok(files)
}

fn emit_json(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Written → {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
