use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use appforge_lib::config::{load_with_loader, ConfigLoader, PartialConfig, PartialSessionConfig};
use appforge_lib::events::{
    GenerationEventEmitter, EVENT_GENERATION_COMPLETED, EVENT_GENERATION_FAILED,
    EVENT_GENERATION_PROGRESS,
};
use appforge_lib::files::{merge_with_summary, read_json, write_json};
use appforge_lib::utils::{lock_mutex_recover, project_root_for, split_into_chunks};
use appforge_lib::{
    apply_to_collection, normalize, CancelHandle, GeneratedFile, GenerationSession,
    GenerationStep, ProjectFileCollection, StepStatus, TransportError,
};

/// Appforge - decode streamed LLM output into project files
#[derive(Parser, Debug)]
#[command(name = "appforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded model response through the stream decoder
    Decode {
        /// File containing the full model response
        transcript: PathBuf,

        /// Characters per replayed chunk
        #[arg(long, default_value = "64")]
        chunk_size: usize,

        /// Project JSON (list of files) to merge the result into
        #[arg(long)]
        project: Option<PathBuf>,

        /// Where to write the merged project (defaults to --project, else stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the preview document to this file when one is produced
        #[arg(long)]
        preview_out: Option<PathBuf>,

        /// Config file used in place of the global one
        #[arg(long, env = "APPFORGE_CONFIG")]
        config: Option<PathBuf>,

        /// Seconds to wait for a chunk before failing (0 disables)
        #[arg(long)]
        chunk_timeout: Option<u64>,
    },

    /// Merge a JSON list of generated files into a project JSON
    Merge {
        /// Project JSON to merge into
        project: PathBuf,

        /// JSON list of incoming files
        incoming: PathBuf,

        /// Where to write the result (defaults to overwriting PROJECT)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the normalized form of each path
    Normalize {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Decode {
            transcript,
            chunk_size,
            project,
            out,
            preview_out,
            config,
            chunk_timeout,
        } => {
            let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            rt.block_on(decode(DecodeArgs {
                transcript,
                chunk_size,
                project,
                out,
                preview_out,
                config,
                chunk_timeout,
            }))
        }
        Command::Merge {
            project,
            incoming,
            out,
        } => merge_files(&project, &incoming, out.as_deref()),
        Command::Normalize { paths } => {
            for path in &paths {
                println!("{}", normalize(path));
            }
            Ok(())
        }
    }
}

struct DecodeArgs {
    transcript: PathBuf,
    chunk_size: usize,
    project: Option<PathBuf>,
    out: Option<PathBuf>,
    preview_out: Option<PathBuf>,
    config: Option<PathBuf>,
    chunk_timeout: Option<u64>,
}

async fn decode(args: DecodeArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.transcript).map_err(|e| {
        anyhow!(
            "Failed to read transcript '{}': {}",
            args.transcript.display(),
            e
        )
    })?;

    let existing = match args.project {
        Some(ref path) if path.exists() => load_collection(path)?,
        _ => ProjectFileCollection::new(),
    };

    let mut loader = ConfigLoader::new();
    if let Some(ref path) = args.config {
        loader = loader.with_global_path(Some(path.clone()));
    }
    if let Some(ref path) = args.project {
        loader = loader.with_project_path(&project_root_for(path));
    }
    let overrides = args.chunk_timeout.map(|secs| PartialConfig {
        session: Some(PartialSessionConfig {
            chunk_timeout_secs: Some(secs),
        }),
        ..Default::default()
    });
    let config = load_with_loader(&loader, overrides)?;

    let session = GenerationSession::new(&config, existing.keys());
    let chunks: Vec<Result<String, TransportError>> = split_into_chunks(&text, args.chunk_size)
        .into_iter()
        .map(Ok)
        .collect();
    log::debug!(
        "Replaying {} chunks from {}",
        chunks.len(),
        args.transcript.display()
    );

    let emitter = PrintEmitter::new();
    let generated = session
        .run(
            futures_util::stream::iter(chunks),
            &emitter,
            &CancelHandle::new(),
        )
        .await
        .map_err(|e| anyhow!("{} ({})", e.user_message(), e))?;

    if let (Some(path), Some(preview)) = (&args.preview_out, &generated.preview_document) {
        std::fs::write(path, preview)
            .map_err(|e| anyhow!("Failed to write preview '{}': {}", path.display(), e))?;
    }

    let merged = apply_to_collection(&existing, &generated);
    match args.out.as_ref().or(args.project.as_ref()) {
        Some(path) => save_collection(path, &merged),
        None => print_collection(&merged),
    }
}

fn merge_files(project: &Path, incoming: &Path, out: Option<&Path>) -> Result<()> {
    let existing = load_collection(project)?;
    let files: Vec<GeneratedFile> = read_json(incoming).map_err(|e| anyhow!(e))?;

    let (merged, summary) = merge_with_summary(&existing, &files);
    eprintln!(
        "{} created, {} updated, {} files total",
        summary.created,
        summary.updated,
        merged.len()
    );

    save_collection(out.unwrap_or(project), &merged)
}

fn load_collection(path: &Path) -> Result<ProjectFileCollection> {
    read_json(path).map_err(|e| anyhow!(e))
}

fn save_collection(path: &Path, collection: &ProjectFileCollection) -> Result<()> {
    write_json(path, collection).map_err(|e| anyhow!(e))?;
    eprintln!("Wrote {} files to {}", collection.len(), path.display());
    Ok(())
}

fn print_collection(collection: &ProjectFileCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(collection)
        .map_err(|e| anyhow!("Failed to serialize project: {}", e))?;
    println!("{}", json);
    Ok(())
}

/// Prints step transitions to stderr as progress events arrive
struct PrintEmitter {
    seen: Mutex<HashMap<String, StepStatus>>,
}

impl PrintEmitter {
    fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn print_changes(&self, steps: Vec<GenerationStep>) {
        let mut seen = lock_mutex_recover(&self.seen);
        for step in steps {
            if seen.get(&step.id) == Some(&step.status) {
                continue;
            }
            match step.line_count {
                Some(lines) => eprintln!("[{}] {} ({} lines)", step.status, step.label, lines),
                None => eprintln!("[{}] {}", step.status, step.label),
            }
            seen.insert(step.id, step.status);
        }
    }
}

impl GenerationEventEmitter for PrintEmitter {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        match event {
            EVENT_GENERATION_PROGRESS => {
                let steps = payload
                    .get("steps")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<Vec<GenerationStep>>(v).ok())
                    .unwrap_or_default();
                self.print_changes(steps);
            }
            EVENT_GENERATION_COMPLETED => {
                eprintln!(
                    "Generation finished: {} files, {} incomplete, preview: {}",
                    payload["fileCount"], payload["incompleteCount"], payload["hasPreview"]
                );
            }
            EVENT_GENERATION_FAILED => {
                eprintln!("Generation failed: {}", payload["userMessage"]);
            }
            _ => log::debug!("Ignoring event {}", event),
        }
    }
}
