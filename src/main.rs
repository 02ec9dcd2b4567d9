use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod card_renderer;
mod comment;
mod error;
mod normalizer;
mod resolver;
mod selector;
mod session;

use comment::{CommentBatch, CommentRecord};
use selector::{Animation, DrawState, ImmediateScheduler, Scheduler, SleepScheduler};
use session::Session;

const LIST_LIMIT: usize = 100;

#[derive(Parser)]
#[command(name = "sorteiagram")]
#[command(about = "Draw a random winner among Instagram comments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    source: Source,

    /// Seed for the draw, makes the result reproducible
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of picks in the animated reveal
    #[arg(long, global = true, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    iterations: u32,

    /// Skip the pauses between picks
    #[arg(long, global = true)]
    no_animation: bool,

    /// Print the loaded comments with the winner marked
    #[arg(long, global = true)]
    list: bool,

    /// Print the winner as JSON instead of the announcement
    #[arg(long, global = true)]
    json: bool,

    /// Also render a PNG result card (font override: SORTEIAGRAM_FONT_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    card: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Source {
    /// Load comments from a JSON or text file (one comment per line)
    File { path: PathBuf },

    /// Generate demo comments for an Instagram post or reel link (no network access)
    Link { url: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = Session::new(Animation { iterations: cli.iterations, ..Animation::default() });

    let count = match &cli.source {
        Source::File { path } => session
            .load_file(path)
            .with_context(|| format!("Erro ao processar o arquivo {}", path.display()))?,
        Source::Link { url } => session.load_link(url).context("Link do Instagram inválido")?,
    };
    eprintln!("Total: {count} comentários disponíveis para sorteio");

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let mut scheduler: Box<dyn Scheduler> = if cli.no_animation {
        Box::new(ImmediateScheduler)
    } else {
        Box::new(SleepScheduler)
    };

    let animate = !cli.no_animation;
    let winner = session
        .run_draw(&mut rng, scheduler.as_mut(), |pick, state| {
            if animate && matches!(state, DrawState::Animating { .. }) {
                eprint!("\rSorteando... @{:<40}", pick.username());
            }
        })?
        .cloned()
        .context("sorteio cancelado")?;
    if animate { eprintln!(); }

    if cli.list {
        for row in comment_rows(session.comments(), &winner) {
            println!("{row}");
        }
        println!();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&winner)?);
    } else if let Some(text) = session.announcement() {
        println!("{text}");
    }

    if let Some(path) = &cli.card {
        card_renderer::render_winner_card(&winner, session.comments().len(), path)
            .with_context(|| format!("failed to write winner card to {}", path.display()))?;
        eprintln!("Winner card written to {}", path.display());
    }
    Ok(())
}

// Rows are matched by id, so duplicate ids highlight every matching row.
fn comment_rows(comments: &CommentBatch, winner: &CommentRecord) -> Vec<String> {
    let mut rows: Vec<String> = comments
        .iter()
        .take(LIST_LIMIT)
        .map(|comment| {
            let mark = if comment.id() == winner.id() { "🏆" } else { "  " };
            format!("{mark} @{}: {}", comment.username(), comment.text())
        })
        .collect();
    if comments.len() > LIST_LIMIT {
        rows.push(format!("... e mais {} comentários", comments.len() - LIST_LIMIT));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentId;

    fn record(id: i64, username: &str) -> CommentRecord {
        CommentRecord::new(CommentId::Index(id), username, format!("texto de {username}"))
    }

    #[test]
    fn test_rows_mark_every_duplicate_id() {
        let batch: CommentBatch = vec![record(0, "ana"), record(1, "bruno"), record(0, "carla")].into();
        let rows = comment_rows(&batch, &record(0, "ana"));
        assert_eq!(rows, [
            "🏆 @ana: texto de ana",
            "   @bruno: texto de bruno",
            "🏆 @carla: texto de carla",
        ]);
    }

    #[test]
    fn test_rows_stop_at_limit_with_footer() {
        let batch: CommentBatch = (0..130).map(|i| record(i, &format!("u{i}"))).collect::<Vec<_>>().into();
        let rows = comment_rows(&batch, &record(129, "u129"));
        assert_eq!(rows.len(), LIST_LIMIT + 1);
        assert_eq!(rows[LIST_LIMIT - 1], "   @u99: texto de u99");
        assert_eq!(rows[LIST_LIMIT], "... e mais 30 comentários");
        assert!(rows.iter().all(|r| !r.starts_with("🏆")));
    }

    #[test]
    fn test_rows_without_overflow_have_no_footer() {
        let batch: CommentBatch = (0..LIST_LIMIT as i64).map(|i| record(i, "x")).collect::<Vec<_>>().into();
        let rows = comment_rows(&batch, &record(5, "x"));
        assert_eq!(rows.len(), LIST_LIMIT);
        assert_eq!(rows.iter().filter(|r| r.starts_with("🏆")).count(), 1);
    }
}
