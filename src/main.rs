//! Headless driver for the comic viewport.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` plus per-book overrides.
//! - Feed JSON commands from stdin into a viewer session and print one JSON
//!   event per line on stdout.
//! - With `--fetch`, load the preload window on a worker thread and feed each
//!   result back as it arrives.

use anyhow::{Context, Result, anyhow};
use comic_viewer_core::cache::{hash_dir, load_book_config, merge_book_overrides, save_book_config};
use comic_viewer_core::cancellation::PreloadToken;
use comic_viewer_core::config::{AppConfig, load_config};
use comic_viewer_core::page_image::HttpPageFetcher;
use comic_viewer_core::spread::PageDimensions;
use comic_viewer_core::{
    BookKey, ScrollSurface, ViewerCommand, ViewerEvent, ViewerSession,
};
use std::collections::HashSet;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: comic-viewer <book-id> <format> <total-pages> [initial-page] [--fetch]";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    book_id: String,
    format: String,
    total_pages: u32,
    initial_page: Option<i64>,
    fetch: bool,
}

/// Everything the main loop reacts to.
enum Input {
    Line(String),
    Closed,
    Fetched {
        book: BookKey,
        page: u32,
        result: Result<PageDimensions>,
    },
}

struct PreloadJob {
    token: PreloadToken,
    pages: Vec<u32>,
}

/// Queues preload batches for the worker, never asking for a page twice
/// while it is in flight.
struct Preloader {
    jobs: Sender<PreloadJob>,
    book: Option<BookKey>,
    in_flight: HashSet<u32>,
}

impl Preloader {
    fn spawn(fetcher: HttpPageFetcher, inputs: Sender<Input>) -> Self {
        let (jobs, queue) = mpsc::channel::<PreloadJob>();
        thread::spawn(move || {
            for job in queue {
                let book = job.token.book().clone();
                let requested = fetcher.preload(&job.token, &job.pages, |page, result| {
                    let fetched = Input::Fetched {
                        book: book.clone(),
                        page,
                        result,
                    };
                    if inputs.send(fetched).is_err() {
                        job.token.cancel();
                    }
                });
                debug!(book = %book, requested, queued = job.pages.len(), "Preload batch finished");
            }
        });
        Self {
            jobs,
            book: None,
            in_flight: HashSet::new(),
        }
    }

    fn schedule(&mut self, session: &mut ViewerSession) {
        let token = session.view().preload_token();
        if self.book.as_ref() != Some(token.book()) {
            self.in_flight.clear();
            self.book = Some(token.book().clone());
        }
        let window = session.view_mut().preload_pages();
        let pages: Vec<u32> = window
            .into_iter()
            .filter(|page| !session.view().load_states().is_settled(*page))
            .filter(|page| !self.in_flight.contains(page))
            .collect();
        if pages.is_empty() {
            return;
        }
        debug!(book = %token.book(), ?pages, "Queueing preload");
        self.in_flight.extend(pages.iter().copied());
        if self.jobs.send(PreloadJob { token, pages }).is_err() {
            warn!("Preload worker is gone; page images will not load");
        }
    }

    fn finished(&mut self, book: &BookKey, page: u32) {
        if self.book.as_ref() == Some(book) {
            self.in_flight.remove(&page);
        }
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let base_config = load_config(Path::new("conf/config.toml"));
    let key = BookKey::new(args.book_id.clone(), args.format.clone());
    let overrides = load_book_config(&key);
    if overrides.is_some() {
        info!(book = %key, dir = %hash_dir(&key).display(), "Loaded per-book overrides from cache");
    }
    let config = merge_book_overrides(&base_config, overrides);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        book = %key,
        total_pages = args.total_pages,
        level = %config.log_level,
        "Starting comic viewer"
    );

    let mut session = ViewerSession::from_config(
        args.book_id,
        args.format,
        args.total_pages,
        args.initial_page,
        &config,
    );

    let (inputs, receiver) = mpsc::channel();
    let mut preloader = if args.fetch {
        info!(base_url = %config.base_url, "Fetching page images from server");
        let fetcher = HttpPageFetcher::new(config.base_url.clone(), config.request_timeout())?;
        Some(Preloader::spawn(fetcher, inputs.clone()))
    } else {
        None
    };
    spawn_stdin_reader(inputs);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(preloader) = preloader.as_mut() {
        preloader.schedule(&mut session);
    }
    while let Some(input) = next_input(&receiver, &session) {
        let command = match input {
            None => ViewerCommand::Tick,
            Some(Input::Closed) => break,
            Some(Input::Line(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str(line) {
                    Ok(command) => command,
                    Err(err) => {
                        warn!("Skipping malformed command: {err}");
                        continue;
                    }
                }
            }
            Some(Input::Fetched { book, page, result }) => {
                if let Some(preloader) = preloader.as_mut() {
                    preloader.finished(&book, page);
                }
                if &book != session.view().book_key() {
                    debug!(%book, page, "Dropping page result for a closed book");
                    continue;
                }
                fetched_command(page, result)
            }
        };
        debug!(action = command.action(), "Applying command");
        let event = session.apply_command(command, Instant::now());
        write_event(&mut out, &event)?;
        if let Some(preloader) = preloader.as_mut() {
            preloader.schedule(&mut session);
        }
    }
    info!("Input closed; shutting down");

    let book = session.view().book_key().clone();
    if let Err(err) = save_book_config(&book, &remember_viewport(&config, &session)) {
        warn!(%book, "Failed to save per-book config: {err:#}");
    }
    Ok(())
}

/// Block until the next input, or until the pending smooth-scroll restore is
/// due (`Some(None)`). `None` once every sender is gone.
fn next_input(receiver: &Receiver<Input>, session: &ViewerSession) -> Option<Option<Input>> {
    match session.view().smooth_scroll().deadline() {
        Some(deadline) => {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(input) => Some(Some(input)),
                Err(RecvTimeoutError::Timeout) => Some(None),
                Err(RecvTimeoutError::Disconnected) => None,
            }
        }
        None => receiver.recv().ok().map(Some),
    }
}

fn spawn_stdin_reader(inputs: Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line.context("failed to read command from stdin") {
                Ok(line) => line,
                Err(err) => {
                    error!("{err:#}");
                    break;
                }
            };
            if inputs.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = inputs.send(Input::Closed);
    });
}

fn fetched_command(page: u32, result: Result<PageDimensions>) -> ViewerCommand {
    match result {
        Ok(dims) => ViewerCommand::PageLoaded {
            page,
            width: dims.width,
            height: dims.height,
        },
        Err(err) => ViewerCommand::PageFailed {
            page,
            reason: format!("{err:#}"),
        },
    }
}

/// The config to store for the open book: `config` with the viewport size the
/// session ended with.
fn remember_viewport(config: &AppConfig, session: &ViewerSession) -> AppConfig {
    let mut remembered = config.clone();
    if let Some(surface) = session.view().surface() {
        remembered.client_width = surface.client_width();
        remembered.client_height = surface.client_height();
    }
    remembered
}

fn write_event(out: &mut impl Write, event: &ViewerEvent) -> Result<()> {
    serde_json::to_writer(&mut *out, event).context("failed to encode event")?;
    writeln!(out).context("failed to write event")?;
    out.flush().context("failed to flush stdout")
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Args> {
    let mut fetch = false;
    let mut positional = Vec::new();
    for arg in args {
        if arg == "--fetch" {
            fetch = true;
        } else {
            positional.push(arg);
        }
    }
    let mut positional = positional.into_iter();
    let book_id = positional.next().ok_or_else(|| anyhow!(USAGE))?;
    let format = positional.next().ok_or_else(|| anyhow!(USAGE))?;
    let total_pages = positional
        .next()
        .ok_or_else(|| anyhow!(USAGE))?
        .parse::<u32>()
        .context("total-pages must be a non-negative integer")?;
    let initial_page = positional
        .next()
        .map(|page| page.parse::<i64>())
        .transpose()
        .context("initial-page must be an integer")?;
    if let Some(extra) = positional.next() {
        return Err(anyhow!("Unexpected argument: {extra}\n{USAGE}"));
    }
    Ok(Args {
        book_id,
        format,
        total_pages,
        initial_page,
        fetch,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_positional_arguments_and_fetch_flag() {
        let parsed = args(&["17", "cbz", "120", "--fetch", "12"]).expect("valid args");
        assert_eq!(
            parsed,
            Args {
                book_id: "17".to_string(),
                format: "cbz".to_string(),
                total_pages: 120,
                initial_page: Some(12),
                fetch: true,
            }
        );
    }

    #[test]
    fn failed_fetch_becomes_a_page_failure() {
        assert_eq!(
            fetched_command(3, Ok(PageDimensions::new(900, 1300))),
            ViewerCommand::PageLoaded {
                page: 3,
                width: 900,
                height: 1300
            }
        );
        match fetched_command(4, Err(anyhow!("HTTP 404"))) {
            ViewerCommand::PageFailed { page, reason } => {
                assert_eq!(page, 4);
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn saved_config_keeps_the_last_viewport_size() {
        let config = AppConfig::default();
        let mut session = ViewerSession::from_config("7", "cbz", 10, None, &config);
        session.apply_command(
            ViewerCommand::Resize {
                width: 640.0,
                height: 480.0,
            },
            Instant::now(),
        );
        let remembered = remember_viewport(&config, &session);
        assert_eq!(remembered.client_width, 640.0);
        assert_eq!(remembered.client_height, 480.0);
        assert_eq!(remembered.overscan, config.overscan);
    }

    #[test]
    fn smooth_restore_deadline_wakes_the_loop() {
        let config = AppConfig {
            smooth_scroll_restore_delay_ms: 0,
            ..AppConfig::default()
        };
        let mut session = ViewerSession::from_config("7", "cbz", 10, None, &config);
        let (closed, receiver) = mpsc::channel::<Input>();
        drop(closed);
        assert!(next_input(&receiver, &session).is_none());

        let (_inputs, receiver) = mpsc::channel::<Input>();
        session
            .view_mut()
            .scroll_to_page(4, comic_viewer_core::ScrollBehavior::Smooth, Instant::now());
        assert!(matches!(next_input(&receiver, &session), Some(None)));
    }

    #[test]
    fn rejects_missing_or_malformed_arguments() {
        assert!(args(&["17", "cbz"]).is_err());
        assert!(args(&["17", "cbz", "lots"]).is_err());
        assert!(args(&["17", "cbz", "10", "x"]).is_err());
        assert!(args(&["17", "cbz", "10", "1", "2"]).is_err());
    }
}
