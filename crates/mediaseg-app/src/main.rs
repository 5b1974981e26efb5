//! MediaSeg - command-line segmenter
//!
//! Decodes a (synthetic) asset, runs it through one configured segmentation
//! pipeline and stores the segment records as JSON lines.
//!
//! ```text
//! mediaseg <asset> [--out DIR] [--seconds N] [--boundaries DIR] [--params FILE] key=value...
//! mediaseg interview.mp4 type=fixed duration=2s
//! mediaseg interview.mp4 type=descriptorDistance distance=euclidean authorName=meanColor atMost=0.2
//! ```

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use mediaseg_core::SourceMetadata;
use mediaseg_media::{
    frame_feed, spawn_decoder, MediaProbe, Scene, SyntheticConfig, SyntheticDecoder,
};
use mediaseg_segment::{
    spawn_pipeline, BoundaryProvider, CancellationToken, FileBoundaryProvider, JsonlSink,
    PipelineConfig, PipelineDeps, PipelineParams, PolicyConfig, SegmentSink,
    StaticBoundaryProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Colors cycled through by the synthetic scenes.
const PALETTE: [[u8; 4]; 4] = [
    [200, 40, 40, 255],
    [40, 160, 60, 255],
    [40, 60, 200, 255],
    [220, 200, 60, 255],
];

/// Frames buffered between the decoder thread and the pipeline.
const FEED_CAPACITY: usize = 8;

struct CliArgs {
    asset: String,
    out: PathBuf,
    seconds: u64,
    boundaries: Option<PathBuf>,
    params: PipelineParams,
}

fn default_out_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediaseg")
        .join("segments")
}

fn cli() -> Command {
    Command::new("mediaseg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Segments a media asset into time windows and stores the segment records")
        .arg(
            Arg::new("asset")
                .value_name("ASSET")
                .help("Asset to segment; probed when the file exists")
                .required(true),
        )
        .arg(
            Arg::new("pairs")
                .value_name("KEY=VALUE")
                .help("Pipeline parameters, overriding --params")
                .num_args(0..),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("DIR")
                .help("Directory receiving segments.jsonl")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("seconds")
                .short('s')
                .long("seconds")
                .value_name("N")
                .help("Length of the synthesized stream")
                .value_parser(value_parser!(u64))
                .default_value("20"),
        )
        .arg(
            Arg::new("boundaries")
                .short('b')
                .long("boundaries")
                .value_name("DIR")
                .help("Root directory of shot-boundary files")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("params")
                .short('p')
                .long("params")
                .value_name("FILE")
                .help("JSON object of pipeline parameters")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn parse_args(matches: &ArgMatches) -> Result<CliArgs> {
    let mut params = match matches.get_one::<PathBuf>("params") {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            PipelineParams::from_json(&json)?
        }
        None => PipelineParams::new(),
    };

    // key=value arguments override the parameter file
    let pairs = matches
        .get_many::<String>("pairs")
        .into_iter()
        .flatten()
        .map(String::as_str);
    for (key, value) in PipelineParams::from_pairs(pairs)?.iter() {
        params.insert(key, value);
    }

    Ok(CliArgs {
        asset: matches
            .get_one::<String>("asset")
            .cloned()
            .context("missing asset")?,
        out: matches
            .get_one::<PathBuf>("out")
            .cloned()
            .unwrap_or_else(default_out_dir),
        seconds: matches.get_one::<u64>("seconds").copied().unwrap_or(20),
        boundaries: matches.get_one::<PathBuf>("boundaries").cloned(),
        params,
    })
}

/// Scenes of three seconds each, cycling through the palette.
fn synthetic_script(seconds: u64) -> SyntheticConfig {
    let scenes = (0..seconds.div_ceil(3))
        .map(|i| {
            let length = (seconds - i * 3).min(3);
            let color = PALETTE[i as usize % PALETTE.len()];
            Scene::new(Duration::from_secs(length), color, 220.0 * (1 + i % 4) as f32)
        })
        .collect();
    SyntheticConfig {
        scenes,
        ..SyntheticConfig::default()
    }
    .with_mean_color()
}

fn boundary_provider(
    config: &PipelineConfig,
    boundaries: Option<&Path>,
) -> Option<Arc<dyn BoundaryProvider>> {
    let PolicyConfig::ShotBoundary(sb) = &config.policy else {
        return None;
    };
    Some(match boundaries {
        Some(dir) => Arc::new(FileBoundaryProvider::new(sb.provider.clone(), dir)),
        None => {
            warn!(provider = %sb.provider, "No --boundaries directory, shot lists will be empty");
            Arc::new(StaticBoundaryProvider::new(sb.provider.clone()))
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args(&cli().get_matches())?;
    info!("MediaSeg starting...");

    let config = PipelineConfig::from_params(&args.params)?;
    info!(policy = config.policy.name(), "Pipeline configured");

    let sink = Arc::new(
        JsonlSink::open(&args.out)
            .with_context(|| format!("Failed to open segment sink in {}", args.out.display()))?,
    );
    let mut deps = PipelineDeps::new().with_sink(sink.clone() as Arc<dyn SegmentSink>);
    if let Some(provider) = boundary_provider(&config, args.boundaries.as_deref()) {
        deps = deps.with_boundary_provider(provider);
    }

    let script = synthetic_script(args.seconds);
    let decoder = if Path::new(&args.asset).exists() {
        let probe = MediaProbe::probe(&args.asset)?;
        info!(
            asset = %probe.path,
            media_type = probe.media_type.as_str(),
            size_bytes = probe.size_bytes,
            "Probed asset; frames are synthesized"
        );
        if !probe.is_temporal() {
            warn!(asset = %probe.path, "Asset has no timeline of its own");
        }
        SyntheticDecoder::for_source(probe.into_source(SourceMetadata::default()), script)?
    } else {
        let name = Path::new(&args.asset)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| args.asset.clone());
        SyntheticDecoder::open(&name, script)?
    };
    let (feed, frames) = frame_feed(FEED_CAPACITY);
    let decoder_thread = spawn_decoder(decoder, feed)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing open windows");
            ctrl_c.cancel();
        }
    });

    let (mut segments, handle) = spawn_pipeline(config, deps, frames, cancel)?;
    while let Some(segment) = segments.recv().await {
        let range = segment
            .time_range
            .map(|r| r.to_string())
            .unwrap_or_default();
        info!(
            id = %segment.id,
            source = %segment.source.name,
            frames = segment.frames.len(),
            descriptors = segment.descriptors.len(),
            range = %range,
            "Segment"
        );
    }

    let report = handle.await.context("Segmentation task failed")?;
    drop(segments);
    let decoded = tokio::task::spawn_blocking(move || decoder_thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("Decoder thread panicked"))?;

    info!(
        decoded,
        segments = report.total_segments(),
        out = %sink.path().display(),
        "MediaSeg finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed_sources().next().is_some() {
        bail!("segmentation failed for at least one source");
    }
    Ok(())
}
