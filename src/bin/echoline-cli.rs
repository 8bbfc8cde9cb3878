use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use echoline::transcript::{read_drafts, write_transcript};
use echoline::{
    DraftStore, EditorSession, MemoryStore, Opts, OutputType, PlaybackSession, SubmitOutcome,
    SubmitPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "echoline")]
#[command(about = "Validate, export and replay sentence-segmented transcripts")]
struct Params {
    /// JSON array of draft segments (`text`, `translation`, `startTime`, `endTime`).
    #[arg(short = 'i', long = "input")]
    input_path: String,

    /// Title for the training item. Defaults to the input file stem.
    #[arg(short = 't', long = "title")]
    title: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the committed transcript to stdout.
    Export {
        #[arg(
            short = 'o',
            long = "output-type",
            value_enum,
            default_value_t = OutputType::Json
        )]
        output_type: OutputType,
    },

    /// Print the active segment for each clock position.
    Locate {
        /// Clock positions in seconds, processed in order as ticks.
        #[arg(long = "at", required = true, num_args = 1..)]
        at: Vec<f64>,

        /// Loop this segment before the first tick.
        #[arg(long = "loop-index")]
        loop_index: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    echoline::init_logging();

    if let Err(err) = run().await {
        error!(error = ?err, "echoline-cli failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();
    let opts = get_opts(&params);

    let file = File::open(&params.input_path)
        .with_context(|| format!("failed to open '{}'", params.input_path))?;
    let drafts = read_drafts(file).context("failed to parse draft segments")?;

    let mut draft = DraftStore::new();
    for (index, candidate) in drafts.into_iter().enumerate() {
        draft
            .add_or_update_composer(candidate)
            .with_context(|| format!("segment {index} is invalid"))?;
    }

    let title = params.title.clone().unwrap_or_else(|| {
        Path::new(&params.input_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let store = MemoryStore::new();
    let mut session = EditorSession::new(title);
    session.draft = draft;
    let item = match session.submit(&store, SubmitPolicy::DiscardComposer).await? {
        SubmitOutcome::Committed(item) => item,
        SubmitOutcome::UnsavedComposer => bail!("unexpected unsaved composer"),
    };
    info!(segments = item.segments.len(), "transcript committed");

    let stdout = io::stdout();
    match params.command {
        Command::Export { .. } => {
            write_transcript(&item.segments, stdout.lock(), &opts)?;
        }
        Command::Locate { at, loop_index } => {
            let mut playback = PlaybackSession::new(item.segments, &opts);
            if let Some(index) = loop_index {
                playback.select_loop(index);
            }

            let mut out = stdout.lock();
            for t in at {
                let outcome = playback.on_tick(t);
                let active = outcome
                    .active
                    .map_or_else(|| "-".to_owned(), |i| i.to_string());
                match outcome.seek_to {
                    Some(seek) => writeln!(out, "{t:.3}\t{active}\tseek {:.3}", seek.to)?,
                    None => writeln!(out, "{t:.3}\t{active}")?,
                }
            }
        }
    }

    Ok(())
}

/// Map CLI flags into library-level options.
fn get_opts(params: &Params) -> Opts {
    match params.command {
        Command::Export { output_type } => Opts {
            output_type,
            ..Opts::default()
        },
        Command::Locate { .. } => Opts::default(),
    }
}
