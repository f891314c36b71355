//! Flush Cassette CLI - Record flush animations and inspect cassettes.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use image::{Rgba, RgbaImage};

use flush_cassette::{
    animation::{CassetteDeck, CassetteHeader, Frame},
    cancel::CancelToken,
    compute::{FlushStepper, GenerationStats, record_to_file, record_to_writer},
    schema::{FlushConfig, Placement, RechargeMode, SourceImage},
};

#[derive(Parser)]
#[command(name = "flush-cassette")]
#[command(about = "Record spiral-drain flush animations to cassettes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flush an image and record the animation
    Record(RecordArgs),

    /// Load a cassette and walk its frames
    Play {
        /// Cassette file
        cassette: PathBuf,

        /// Write every frame as a PNG into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Print an example JSON configuration
    ExampleConfig,
}

#[derive(Args)]
struct RecordArgs {
    /// Source image (PNG or JPEG)
    #[arg(short, long)]
    image: PathBuf,

    /// Output cassette file (default: stdout)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Cassette title
    #[arg(long)]
    title: Option<String>,

    /// Sound reference stored in the cassette
    #[arg(long)]
    sound: Option<String>,

    /// Scale the image to the cassette size instead of clipping it
    #[arg(long)]
    scale_image: bool,

    /// JSON configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cassette size in pixels (default: smaller image side)
    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    hole_size: Option<u32>,

    #[arg(long)]
    fragment_size: Option<u32>,

    /// Degrees of rotation per tick
    #[arg(long)]
    rotation_increment: Option<u32>,

    /// Milliseconds per flushing frame
    #[arg(long)]
    flush_delay: Option<u32>,

    /// Milliseconds to hold the final frame
    #[arg(long)]
    recharge_delay: Option<u32>,

    #[arg(long)]
    num_spiral: Option<usize>,

    /// Minimum spiral scale (0.00-0.99, 0.01 steps)
    #[arg(long)]
    min_spiral: Option<f64>,

    /// Maximum spiral scale (0.00-0.99, 0.01 steps)
    #[arg(long)]
    max_spiral: Option<f64>,

    /// Pull toward the spiral path per tick (0.0-1.0)
    #[arg(long)]
    spiral_converge: Option<f64>,

    #[arg(long)]
    random_seed: Option<u64>,

    /// End on the source image instead of the empty bowl
    #[arg(long)]
    restore: bool,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Record(args) => record(args),
        Commands::Play { cassette, export } => play(&cassette, export.as_deref()),
        Commands::ExampleConfig => print_example_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn record(args: RecordArgs) -> Result<(), Box<dyn Error>> {
    let source = SourceImage::open(&args.image)?;
    let config = build_config(&args, &source)?;
    let placement = if args.scale_image {
        Placement::Scale
    } else {
        Placement::Clip
    };

    let mut header = CassetteHeader::new(config.size);
    if let Some(title) = &args.title {
        header = header.with_title(title.as_str());
    }
    if let Some(sound) = &args.sound {
        header = header.with_sound_ref(sound.as_str());
    }

    // The cassette itself may be going to stdout.
    let mut report: Box<dyn Write> = if args.file.is_some() {
        Box::new(io::stdout())
    } else {
        Box::new(io::stderr())
    };

    writeln!(report, "Flush Cassette Recorder")?;
    writeln!(report, "=======================")?;
    writeln!(
        report,
        "Source: {} ({}x{})",
        args.image.display(),
        source.width(),
        source.height()
    )?;
    writeln!(report, "Cassette: {}x{}", config.size, config.size)?;
    writeln!(
        report,
        "Spirals: {} (scale {:.2}-{:.2}, converge {:.2})",
        config.num_spiral, config.min_spiral, config.max_spiral, config.spiral_converge
    )?;
    writeln!(report)?;

    let canvas = source.render_canvas(config.size, placement);
    let start = Instant::now();
    let stepper = FlushStepper::new(config, canvas)?;
    let cancel = CancelToken::new();
    let generation: GenerationStats = match &args.file {
        Some(path) => {
            let (recording, generation) = record_to_file(stepper, header, path, &cancel)?;
            writeln!(report, "Recorded: {}", recording)?;
            generation
        }
        None => {
            let stdout = io::BufWriter::new(io::stdout().lock());
            let (mut stdout, recording, generation) =
                record_to_writer(stepper, header, stdout, &cancel)?;
            stdout.flush()?;
            writeln!(report, "Recorded: {}", recording)?;
            generation
        }
    };
    let elapsed = start.elapsed();

    writeln!(
        report,
        "Fragments: {}, drained after {} ticks",
        generation.fragments, generation.ticks
    )?;
    writeln!(
        report,
        "Time: {:.2}s ({:.1} frames/s)",
        elapsed.as_secs_f32(),
        generation.frames as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    )?;
    Ok(())
}

/// Start from the config file or size defaults, then apply explicit flags.
fn build_config(args: &RecordArgs, source: &SourceImage) -> Result<FlushConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let mut config: FlushConfig = serde_json::from_str(&text)?;
            if let Some(size) = args.size {
                config.size = size;
            }
            config
        }
        None => FlushConfig::for_size(args.size.unwrap_or_else(|| source.fit_size())),
    };

    if let Some(v) = args.hole_size {
        config.hole_size = v;
    }
    if let Some(v) = args.fragment_size {
        config.fragment_size = v;
    }
    if let Some(v) = args.rotation_increment {
        config.rotation_increment = v;
    }
    if let Some(v) = args.flush_delay {
        config.flush_millis = v;
    }
    if let Some(v) = args.recharge_delay {
        config.recharge_millis = v;
    }
    if let Some(v) = args.num_spiral {
        config.num_spiral = v;
    }
    if let Some(v) = args.min_spiral {
        config.min_spiral = v;
    }
    if let Some(v) = args.max_spiral {
        config.max_spiral = v;
    }
    if let Some(v) = args.spiral_converge {
        config.spiral_converge = v;
    }
    if args.random_seed.is_some() {
        config.random_seed = args.random_seed;
    }
    if args.restore {
        config.recharge = RechargeMode::Restore;
    }

    config.validate()?;
    Ok(config)
}

fn play(path: &Path, export: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let deck = CassetteDeck::new();
    let cassette = deck.load_file(path, &CancelToken::new())?;

    println!("Cassette: {}", path.display());
    println!("  Title: {}", cassette.title().unwrap_or("(none)"));
    println!("  Sound: {}", cassette.sound_ref().unwrap_or("(none)"));
    println!("  Size: {}x{}", cassette.size(), cassette.size());
    println!("  Frames: {}", cassette.frame_count());
    println!("  Running time: {} ms", cassette.total_millis());

    if let Some(dir) = export {
        fs::create_dir_all(dir)?;
    }

    let mut cursor = cassette.cursor();
    let mut frame = cursor.first();
    while let Some(current) = frame {
        if let Some(dir) = export {
            let file = dir.join(format!("frame_{:05}.png", cursor.position()));
            to_image(current, cassette.size()).save(&file)?;
        }
        frame = cursor.next();
    }

    if let Some(dir) = export {
        println!(
            "Exported {} frames to {}",
            cassette.frame_count(),
            dir.display()
        );
    }
    Ok(())
}

fn to_image(frame: &Frame, size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let argb = frame.pixels[(y * size + x) as usize];
        let [a, r, g, b] = argb.to_be_bytes();
        Rgba([r, g, b, a])
    })
}

fn print_example_config() -> Result<(), Box<dyn Error>> {
    let config = FlushConfig {
        random_seed: Some(42),
        ..FlushConfig::default()
    };

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
