mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rustyline::DefaultEditor;
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Op};
use subfetch::config::Config;
use subfetch::workflows::{saver, table};
use subfetch::{
    Candidate, Error, HttpRpcTransport, Query, ResultCache, SearchEngine, SearchOutcome,
    SubtitleSession,
};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let default_filter = if cli.verbose { "subfetch=debug" } else { "subfetch=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        // stdout may carry the subtitle itself
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if cli.file.is_none() && cli.title.is_none() {
        bail!("Must specify either --file or --title");
    }
    if let Some(file) = &cli.file {
        if !file.is_file() {
            bail!("Movie file does not exist: {file:?}");
        }
    }

    let config = Config::load()?;
    let languages = if cli.languages.is_empty() {
        config.languages.clone()
    } else {
        cli.languages.clone()
    };

    let transport =
        HttpRpcTransport::new(config.endpoint()?, &config.user_agent, config.timeout())?;
    let session = SubtitleSession::new(Arc::new(transport), config.credentials());
    let engine = SearchEngine::new(session, ResultCache::new(config.cache_dir()));

    let outcome = engine
        .search(
            &languages,
            cli.file.as_deref(),
            cli.title.as_deref(),
            cli.refresh,
        )
        .context("Search failed")?;

    match cli.op {
        Op::Query => {
            print_outcome(&outcome);
            Ok(())
        }
        Op::Download => download(&cli, &engine, &outcome),
    }
}

fn print_outcome(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::NotFound(query) => {
            println!("No subtitles found.");
            if let Some(query) = query {
                println!("{}", table::render_parameters(query));
            }
        }
        found => {
            if let Some(query) = found.query() {
                println!(
                    "Found {} subtitle(s) by {}:",
                    query.results().len(),
                    found.strategy()
                );
                println!("{}", table::render_results(query));
            }
        }
    }
}

fn download(cli: &Cli, engine: &SearchEngine, outcome: &SearchOutcome) -> Result<()> {
    let Some(query) = outcome.query().filter(|q| q.has_results()) else {
        print_outcome(outcome);
        bail!("Nothing to download");
    };

    let index = match (cli.lucky, cli.index) {
        (true, _) => 0,
        (false, Some(index)) => index,
        (false, None) => {
            eprintln!("{}", table::render_results(query));
            prompt_index(query)?
        }
    };
    let candidate = query.get(index).with_context(|| {
        format!(
            "No result at index {index}, there are {}",
            query.results().len()
        )
    })?;
    info!("Selected {} ({})", candidate.file_name, candidate.language_name());

    let content = engine.download_subtitle(&candidate.id, cli.refresh)?;

    if !cli.save {
        io::stdout().write_all(&content)?;
        return Ok(());
    }
    let movie = cli
        .file
        .as_deref()
        .context("--save needs --file to know where the movie is")?;
    save(movie, candidate, &content, cli.yes)
}

fn save(movie: &Path, candidate: &Candidate, content: &[u8], overwrite: bool) -> Result<()> {
    for existing in saver::existing_subtitles(movie)? {
        warn!("Subtitle already present: {}", existing.display());
    }

    let path = match saver::save_next_to_movie(movie, &candidate.format, content, overwrite) {
        Ok(path) => path,
        Err(Error::Io { path, source }) if source.kind() == ErrorKind::AlreadyExists => {
            if !saver::confirm_overwrite(&path) {
                println!("Skipped.");
                return Ok(());
            }
            saver::save_next_to_movie(movie, &candidate.format, content, true)?
        }
        Err(e) => return Err(e.into()),
    };
    println!("Saved {}", path.display());
    Ok(())
}

fn prompt_index(query: &Query) -> Result<usize> {
    let last = query.results().len() - 1;
    let mut rl = DefaultEditor::new()?;
    loop {
        let input = rl.readline(&format!("Select subtitle (0-{last}): "))?;
        match input.trim().parse::<usize>() {
            Ok(index) if index <= last => return Ok(index),
            _ => println!("Please enter a number between 0 and {last}."),
        }
    }
}
