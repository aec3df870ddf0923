use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use dcpwriter::{AudioBuffers, DcpTime, Eyes, Frame, Job, PackageSpec, Writer, WriterOpts};

#[derive(Parser, Debug)]
#[command(name = "dcpwriter", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump the records of a recovery index.
    Index(IndexArgs),
    /// Print the frame an interrupted picture asset would resume from.
    Verify(VerifyArgs),
    /// Package pre-encoded frames, reusing intact frames from a previous run.
    Package(PackageArgs),
}

#[derive(Parser, Debug)]
struct IndexArgs {
    /// Recovery index file.
    info: PathBuf,

    /// Index holds left/right records per frame.
    #[arg(long)]
    stereo: bool,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    /// Internal picture asset.
    asset: PathBuf,

    /// Recovery index file.
    info: PathBuf,

    /// Asset is stereoscopic.
    #[arg(long)]
    stereo: bool,
}

#[derive(Parser, Debug)]
struct PackageArgs {
    /// Package description JSON.
    spec: PathBuf,

    /// Directory of encoded frames named `NNNNNN.j2c`, or `NNNNNN_left.j2c`/`NNNNNN_right.j2c`
    /// for stereo packages. A missing frame repeats the one before it.
    frames: PathBuf,

    /// Output package directory.
    output: PathBuf,

    /// WAV file laid from the start of the timeline.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Producer threads feeding picture.
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Index(args) => cmd_index(args),
        Command::Verify(args) => cmd_verify(args),
        Command::Package(args) => cmd_package(args),
    }
}

fn eyes_for(stereo: bool) -> &'static [Eyes] {
    if stereo {
        &[Eyes::Left, Eyes::Right]
    } else {
        &[Eyes::Both]
    }
}

fn cmd_index(args: IndexArgs) -> anyhow::Result<()> {
    let files = dcpwriter::InfoFiles::new();
    let mut handle = files
        .open(&args.info, true)
        .with_context(|| format!("open recovery index '{}'", args.info.display()))?;
    let last = dcpwriter::last_recorded_frame(&handle, args.stereo)?;
    for frame in 0..=last {
        for &eyes in eyes_for(args.stereo) {
            match dcpwriter::FrameInfo::read(&mut handle, frame, eyes)? {
                Some(info) => println!(
                    "{frame:>6} {eyes:<5} offset={} size={} sha256={}",
                    info.offset,
                    info.size,
                    dcpwriter::digest_hex(&info.hash)
                ),
                None => println!("{frame:>6} {eyes:<5} -"),
            }
        }
    }
    eprintln!("{} frames recorded", last + 1);
    Ok(())
}

fn cmd_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let files = dcpwriter::InfoFiles::new();
    let first = dcpwriter::first_nonexistent_frame(&files, &args.asset, &args.info, args.stereo)
        .with_context(|| format!("verify '{}'", args.asset.display()))?;
    println!("{first}");
    Ok(())
}

/// Prints each sub-task and its progress in tenths.
#[derive(Default)]
struct ConsoleJob {
    decile: Mutex<i32>,
}

impl Job for ConsoleJob {
    fn sub(&self, name: &str) {
        *self.decile.lock() = -1;
        eprintln!("{name}");
    }

    fn set_progress(&self, progress: f32) {
        let d = (progress.clamp(0.0, 1.0) * 10.0).floor() as i32;
        let mut last = self.decile.lock();
        if d > *last {
            *last = d;
            eprintln!("  {}%", d * 10);
        }
    }
}

fn frame_path(dir: &Path, frame: Frame, eyes: Eyes) -> PathBuf {
    match eyes {
        Eyes::Both => dir.join(format!("{frame:06}.j2c")),
        eyes => dir.join(format!("{frame:06}_{eyes}.j2c")),
    }
}

fn feed_frame(writer: &Writer, dir: &Path, frame: Frame) -> anyhow::Result<()> {
    if writer.can_fake_write(frame) {
        for &eyes in writer.spec().eyes() {
            writer.fake_write(frame, eyes)?;
        }
        return Ok(());
    }
    for &eyes in writer.spec().eyes() {
        let path = frame_path(dir, frame, eyes);
        if path.exists() {
            let data = std::fs::read(&path)
                .with_context(|| format!("read frame '{}'", path.display()))?;
            writer.write(Arc::from(data), frame, eyes)?;
        } else if writer.can_repeat(frame) {
            writer.repeat(frame, eyes)?;
        } else {
            anyhow::bail!("frame '{}' is missing and cannot be repeated", path.display());
        }
    }
    Ok(())
}

fn feed_audio(writer: &Writer, path: &Path) -> anyhow::Result<()> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("open audio '{}'", path.display()))?;
    let spec = reader.spec();
    let rate = writer.spec().audio_frame_rate;
    if spec.sample_rate != rate {
        anyhow::bail!(
            "audio '{}' is {} Hz but the package is {rate} Hz",
            path.display(),
            spec.sample_rate
        );
    }
    let channels = usize::from(spec.channels);
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("decode audio '{}'", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("decode audio '{}'", path.display()))?
        }
    };

    let block = rate as usize * channels;
    let mut written: Frame = 0;
    for chunk in samples.chunks(block.max(channels)) {
        let buffers = AudioBuffers::from_interleaved(chunk, channels)?;
        let frames = buffers.frames() as Frame;
        writer.write_audio(&buffers, DcpTime::from_frames(written, f64::from(rate)))?;
        written += frames;
    }
    tracing::info!(frames = written, "audio written");
    Ok(())
}

fn cmd_package(args: PackageArgs) -> anyhow::Result<()> {
    let spec = PackageSpec::from_path(&args.spec)
        .with_context(|| format!("load package spec '{}'", args.spec.display()))?;
    let total: Frame = spec.reels.iter().map(|r| spec.frames_in(*r)).sum();
    let threads = args.threads.max(1);
    let opts = WriterOpts {
        encoder_threads: threads,
        ..WriterOpts::default()
    };

    let job: Arc<dyn Job> = Arc::new(ConsoleJob::default());
    let writer = Writer::new(spec, opts, Some(job)).context("prepare writer")?;
    writer.start()?;

    if let Some(audio) = &args.audio {
        feed_audio(&writer, audio)?;
    }

    std::thread::scope(|s| -> anyhow::Result<()> {
        let workers: Vec<_> = (0..threads)
            .map(|t| {
                let writer = &writer;
                let dir = args.frames.as_path();
                s.spawn(move || -> anyhow::Result<()> {
                    let mut frame = t as Frame;
                    while frame < total {
                        feed_frame(writer, dir, frame)?;
                        frame += threads as Frame;
                    }
                    Ok(())
                })
            })
            .collect();
        for w in workers {
            w.join()
                .map_err(|_| anyhow::anyhow!("frame producer panicked"))??;
        }
        Ok(())
    })?;

    let cpl = writer
        .finish(&args.output)
        .with_context(|| format!("write package '{}'", args.output.display()))?;
    eprintln!(
        "wrote {} ({} reels; {} FULL, {} FAKE, {} REPEAT)",
        args.output.join("CPL.json").display(),
        cpl.reels.len(),
        cpl.counts.full,
        cpl.counts.fake,
        cpl.counts.repeat
    );
    Ok(())
}
