use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use podscrub::{
    AudioEditor, NoopReporter, OpenAiClassifier, OpenAiProcessor, Pipeline, PipelineOptions,
    ProgressEvent, ProgressReporter, ReqwestClient, Settings, SharedProgressReporter,
    WhisperTranscriber,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static PEN: Emoji<'_, '_> = Emoji("✍️  ", "[t] ");
static SCISSORS: Emoji<'_, '_> = Emoji("✂️  ", "[x] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Pull podcast episodes, transcribe them, and cut intro/outro segments
/// from audio and transcript
#[derive(Parser, Debug)]
#[command(name = "podscrub")]
#[command(about = "Pull podcast episodes and scrub intro/outro segments from audio and transcript")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short = 'C', long, default_value = "config.toml")]
    config: PathBuf,

    /// RSS feed URL or local RSS file (overrides the config)
    #[arg(short, long)]
    feed: Option<String>,

    /// Number of new episodes to process
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Process every new episode in the feed
    #[arg(short, long)]
    all: bool,

    /// Only consider episodes whose title contains this string
    #[arg(short, long)]
    search: Option<String>,

    /// Output directory for processed transcripts (overrides the config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn start_download_bar(&self, length: Option<u64>) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length.unwrap_or(0)));
        bar.set_style(style);

        let mut slot = self.download_bar.lock().unwrap();
        if let Some(old) = slot.replace(bar.clone()) {
            old.finish_and_clear();
        }
        bar
    }

    fn finish_download_bar(&self) {
        if let Some(bar) = self.download_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { source } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", source.cyan()));
            }

            ProgressEvent::FeedParsed {
                podcast_title,
                total_episodes,
                selected_episodes,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes, {} selected",
                    podcast_title.bold().green(),
                    total_episodes.to_string().cyan(),
                    selected_episodes.to_string().yellow()
                ));
            }

            ProgressEvent::EpisodeStarted {
                episode_index,
                total_selected,
                episode_title,
            } => {
                self.main_bar.set_message(format!(
                    "[{}/{}] {}",
                    (episode_index + 1).to_string().cyan(),
                    total_selected.to_string().cyan(),
                    truncate_title(&episode_title, 50).bold()
                ));
            }

            ProgressEvent::EpisodeSkipped { episode_title } => {
                self.main_bar.println(format!(
                    "  {} {}",
                    "skip".yellow(),
                    truncate_title(&episode_title, 50).dimmed()
                ));
            }

            ProgressEvent::DownloadStarted { content_length, .. } => {
                self.start_download_bar(content_length);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted {
                episode_title,
                bytes_downloaded,
            } => {
                self.finish_download_bar();
                self.main_bar.println(format!(
                    "  {DOWNLOAD}{} ({})",
                    truncate_title(&episode_title, 50).green(),
                    indicatif::HumanBytes(bytes_downloaded).to_string().dimmed()
                ));
            }

            ProgressEvent::DownloadRetrying {
                attempt,
                max_attempts,
                error,
            } => {
                self.finish_download_bar();
                self.main_bar.println(format!(
                    "  {} attempt {}/{} failed: {}",
                    "retry".yellow(),
                    attempt,
                    max_attempts,
                    error.dimmed()
                ));
            }

            ProgressEvent::Transcribing { episode_title } => {
                self.main_bar.set_message(format!(
                    "{PEN}Transcribing {}",
                    truncate_title(&episode_title, 50).cyan()
                ));
            }

            ProgressEvent::Transcribed { segment_count } => {
                self.main_bar.println(format!(
                    "  {PEN}{} subtitle segments",
                    segment_count.to_string().cyan()
                ));
            }

            ProgressEvent::AdSegmentsDetected { count } => {
                self.main_bar.println(format!(
                    "  {SEARCH}{} intro/outro segment(s) detected",
                    count.to_string().cyan()
                ));
            }

            ProgressEvent::AudioCleaned {
                kept_intervals,
                removed_seconds,
            } => {
                self.main_bar.println(format!(
                    "  {SCISSORS}audio: kept {} span(s), removed {:.0}s",
                    kept_intervals.to_string().cyan(),
                    removed_seconds
                ));
            }

            ProgressEvent::TranscriptCleaned {
                matched_candidates,
                total_candidates,
            } => {
                self.main_bar.println(format!(
                    "  {SCISSORS}transcript: removed {}/{} candidate(s)",
                    matched_candidates.to_string().cyan(),
                    total_candidates.to_string().cyan()
                ));
            }

            ProgressEvent::StageSkipped { stage } => {
                self.main_bar
                    .println(format!("  {} {} (already done)", "skip".yellow(), stage.dimmed()));
            }

            ProgressEvent::EpisodeCompleted { episode_title } => {
                self.main_bar.println(format!(
                    "  {SUCCESS}{}",
                    truncate_title(&episode_title, 50).green()
                ));
            }

            ProgressEvent::EpisodeFailed {
                episode_title,
                error,
            } => {
                self.finish_download_bar();
                self.main_bar.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&episode_title, 40).red(),
                    error.red()
                ));
            }

            ProgressEvent::RunCompleted {
                processed_count,
                skipped_count,
                failed_count,
            } => {
                self.finish_download_bar();
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} processed, {} skipped, {} failed",
                    "Run complete:".bold().green(),
                    processed_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.len() <= max_len {
        title.to_string()
    } else {
        format!("{}...", &title[..max_len.saturating_sub(3)])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("podscrub=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "podscrub".bold().magenta(),
        "- Podcast Cleaner".dimmed()
    );

    let mut settings =
        Settings::load_or_default(&args.config).context("Failed to load configuration")?;

    if let Some(feed) = args.feed {
        settings.feed.url = feed;
    }
    if let Some(output_dir) = args.output_dir {
        settings.paths.output = output_dir;
    }
    if settings.feed.url.is_empty() {
        bail!("No feed configured: set [feed] url in the config file or pass --feed");
    }

    let client = ReqwestClient::with_connect_timeout(Duration::from_secs(
        settings.download.connect_timeout_secs,
    ));

    let editor = AudioEditor::new(&settings.audio);
    editor
        .verify()
        .await
        .context("ffmpeg is required for audio editing")?;

    let transcriber = WhisperTranscriber::new(&settings.transcription);
    let classifier = OpenAiClassifier::new(&settings.llm);
    let processor = OpenAiProcessor::new(&settings.llm);

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let options = PipelineOptions {
        count: if args.all { None } else { Some(args.count) },
        search: args.search,
    };

    let pipeline = Pipeline {
        client: &client,
        transcriber: &transcriber,
        classifier: &classifier,
        processor: &processor,
        editor: &editor,
        settings: &settings,
        reporter,
    };

    let result = pipeline
        .run(&options)
        .await
        .context("Pipeline run failed")?;

    if !args.quiet && !result.failed_episodes.is_empty() {
        println!("\n{}", "Failed episodes:".red().bold());
        for (title, error) in &result.failed_episodes {
            println!(
                "  {}{} - {}",
                CROSS,
                title.yellow(),
                error.to_string().dimmed()
            );
        }
    }

    if !args.quiet {
        println!(
            "\n{FOLDER}Output: {}\n",
            settings.paths.output.display().to_string().cyan()
        );
    }

    if result.failed > 0 && result.processed == 0 {
        std::process::exit(1);
    }

    Ok(())
}
