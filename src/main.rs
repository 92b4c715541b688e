use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use objection_engine::dialogue::{DialogueDirector, DialogueTurn};
use objection_engine::templates::{ScriptTemplate, TemplateType};
use objection_engine::{AppConfig, RenderEngine, ScriptParser};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "objection-engine")]
#[command(about = "Courtroom animation engine", long_about = None)]
struct Cli {
    /// Frames per second of the rendered video
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// Directory holding sprites, fonts and sounds
    #[arg(long, global = true, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Directory for per-job intermediate files
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Path of the final video
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a script to video
    Render {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Check a script without touching any asset
    Validate {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Print the cue list and frame totals of a script
    Plan {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Print the cues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Turn speaking turns (JSON) into a script
    Direct {
        #[arg(value_name = "TURNS")]
        turns: PathBuf,

        /// Seed for pose and cast choices
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate a demo script
    Template {
        #[arg(value_enum)]
        #[arg(name = "type")]
        template_type: TemplateType,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = effective_config(&cli)?;

    match cli.command {
        Commands::Render { ref script } => render(&config, script),
        Commands::Validate { ref script } => validate(script),
        Commands::Plan { ref script, json } => plan(&config, script, json),
        Commands::Direct { ref turns, seed } => direct(&config, turns, seed),
        Commands::Template { template_type } => {
            let script = ScriptTemplate::generate(template_type);
            println!("{}", serde_json::to_string_pretty(&script)?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file and environment, then command-line flags on top.
fn effective_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(fps) = cli.fps {
        config.render.fps = fps;
    }
    if let Some(assets) = &cli.assets {
        config.paths.assets_root = assets.clone();
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config.paths.cache_dir = cache_dir.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output = output.clone();
    }
    config.validate()?;
    Ok(config)
}

fn render(config: &AppConfig, path: &Path) -> Result<()> {
    println!("🎬 Objection Engine\n");
    println!("Parsing script: {}", path.display());
    let script = ScriptParser::parse_json(path)?;

    println!("\n📋 Script Summary:");
    println!("{}", ScriptParser::summarize(&script));

    println!("🎨 Rendering from assets in {}", config.paths.assets_root.display());
    let engine = RenderEngine::new(config.clone());
    let report = engine.render(&script)?;

    println!("\n📊 Render Statistics:");
    println!("  Frames: {} ({:.2}s at {} fps)", report.frames, report.duration_secs, config.render.fps);
    println!("  Audio cues: {}", report.cues);
    println!("  Assets: {}", report.assets);
    println!("  Job directory: {}", report.job_dir.display());

    match &report.output {
        Some(output) => println!("\n✨ Video created successfully: {}", output.display()),
        None => {
            println!("\n⚠️  FFmpeg not found. Skipping video encoding.");
            println!("   Frames are saved in: {}", report.video.display());
            println!("   Audio is saved in: {}", report.audio.display());
        }
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let script = ScriptParser::parse_json(path)?;
    println!("✓ {} is valid", path.display());
    print!("{}", ScriptParser::summarize(&script));
    Ok(())
}

fn plan(config: &AppConfig, path: &Path, json: bool) -> Result<()> {
    let script = ScriptParser::parse_json(path)?;
    let engine = RenderEngine::new(config.clone());
    let (timeline, stats) = engine.plan(&script)?;
    let cues = timeline.cues();

    if json {
        println!("{}", serde_json::to_string_pretty(&cues)?);
        return Ok(());
    }

    println!("📋 Cues:");
    let mut frame = 0;
    for (index, cue) in cues.iter().enumerate() {
        println!("  {:>3}  @{:>5}  {:?}", index, frame, cue);
        frame += cue.frames();
    }
    println!(
        "\nTotal: {} frames, {:.2}s at {} fps",
        timeline.total_frames(),
        timeline.duration_secs(),
        timeline.fps()
    );
    println!("Assets: {}", stats);
    Ok(())
}

fn direct(config: &AppConfig, path: &Path, seed: Option<u64>) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read turns file: {}", path.display()))?;
    let turns: Vec<DialogueTurn> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse turns file: {}", path.display()))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let script = DialogueDirector::from(&config.dialogue).direct(&turns, &mut rng)?;
    println!("{}", serde_json::to_string_pretty(&script)?);
    Ok(())
}
