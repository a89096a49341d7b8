//! # Treasure Quest Main Entry Point
//!
//! Headless driver for the progress core. Plays the question flow from the
//! terminal, or lets a seeded random player run through the catalog.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use treasure_quest::{
    ContentCatalog, Difficulty, GameSession, JsonFileStore, LevelAdvance, ProgressStore,
    QuestResult, SessionStatus, Subject,
};
#[cfg(feature = "dev-tools")]
use tracing::Level;

/// Upper bound on answers the autoplayer submits before giving up.
const AUTOPLAY_ANSWER_LIMIT: usize = 500;

/// Command line arguments for Treasure Quest.
#[derive(Parser, Debug)]
#[command(name = "treasure-quest")]
#[command(about = "Answer questions, open treasures, and keep your progress")]
#[command(version)]
struct Args {
    /// Directory holding the saved progress record (in-memory when omitted)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// JSON file with levels to play instead of the built-in content
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Difficulty to play at (easy, medium, hard)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Subject to focus on (math, science, english, history)
    #[arg(long)]
    subject: Option<Subject>,

    /// Let a random player answer every question
    #[arg(long)]
    autoplay: bool,

    /// Random seed for autoplay
    #[arg(short, long)]
    seed: Option<u64>,

    /// Discard saved progress before starting
    #[arg(long)]
    reset: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> QuestResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level);

    log::info!("Starting Treasure Quest v{}", treasure_quest::VERSION);

    let catalog = match &args.catalog {
        Some(path) => ContentCatalog::from_path(path)?,
        None => ContentCatalog::builtin()?,
    };
    log::info!(
        "Loaded {} levels with {} questions",
        catalog.len(),
        catalog.question_count()
    );

    let store = open_store(&args, Arc::new(catalog))?;
    let mut session = GameSession::new(store)?;

    if let Some(difficulty) = args.difficulty {
        session.store_mut().set_difficulty(difficulty);
    }
    if let Some(subject) = args.subject {
        session.store_mut().set_subject(subject);
    }

    session.start();

    let result = if args.autoplay {
        run_autoplay(&mut session, args.seed)
    } else {
        run_interactive(&mut session).await
    };

    print_summary(&session);
    session.flush()?;
    result
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .parse_filters(log_level)
            .format_target(false)
            .init();
    }
}

fn open_store(args: &Args, catalog: Arc<ContentCatalog>) -> QuestResult<ProgressStore> {
    let Some(dir) = &args.save_dir else {
        return Ok(ProgressStore::new(catalog));
    };

    let persistence = JsonFileStore::in_dir(dir);
    if args.reset && persistence.path().exists() {
        log::info!("Discarding saved progress at {}", persistence.path().display());
        std::fs::remove_file(persistence.path())?;
    }
    Ok(ProgressStore::open(catalog, persistence))
}

/// Seeded random player. Keeps guessing until each treasure opens.
fn run_autoplay(session: &mut GameSession, seed: Option<u64>) -> QuestResult<()> {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    log::info!("Autoplay with seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut answers = 0;

    while session.store().status() == SessionStatus::Running {
        let next = session.remaining_treasures().first().map(|t| t.id.clone());
        let Some(treasure_id) = next else {
            match session.advance_level()? {
                LevelAdvance::Advanced { level_index, perfect } => {
                    println!("Advanced to level {} (perfect: {})", level_index + 1, perfect);
                }
                LevelAdvance::Locked { level_id } => {
                    println!("Level '{}' is locked; stopping", level_id);
                    break;
                }
                LevelAdvance::GameCompleted { .. } => println!("All levels complete!"),
            }
            continue;
        };

        let options = session.open_treasure(&treasure_id)?.options.len();
        while session.active_treasure().is_some() {
            if answers >= AUTOPLAY_ANSWER_LIMIT {
                log::warn!("Autoplay stopped after {} answers", answers);
                return Ok(());
            }
            answers += 1;
            let guess = rng.gen_range(0..options);
            let report = session.answer(guess)?;
            session.tick(rng.gen_range(3..15));
            println!(
                "{}: picked {} -> {}",
                treasure_id,
                guess,
                if report.outcome.correct { "correct" } else { "wrong" }
            );
            for id in &report.unlocked {
                println!("  Achievement unlocked: {}", id);
            }
        }
    }

    Ok(())
}

const HELP: &str = "\
Commands:
  list              show treasures left in this level
  open <treasure>   open a treasure and show its question
  answer <n>        answer the open question with option n
  hint              ask for a hint
  tick <seconds>    let time pass
  next              move on to the next level
  retry             restart this level
  pause | resume
  status
  quit";

async fn run_interactive(session: &mut GameSession) -> QuestResult<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let argument = words.next();

        let outcome = match command {
            "" => Ok(()),
            "list" => {
                for treasure in session.remaining_treasures() {
                    println!("  {} at ({}, {})", treasure.id, treasure.position.x, treasure.position.y);
                }
                Ok(())
            }
            "open" => match argument {
                Some(id) => session.open_treasure(id).map(|question| {
                    println!("{}", question.prompt);
                    for (i, option) in question.options.iter().enumerate() {
                        println!("  {}) {}", i, option);
                    }
                }),
                None => {
                    println!("usage: open <treasure>");
                    Ok(())
                }
            },
            "answer" => match argument.and_then(|n| n.parse::<usize>().ok()) {
                Some(index) => session.answer(index).map(|report| {
                    if report.outcome.correct {
                        println!("Correct! +{} points", report.points_awarded);
                    } else {
                        println!("Not quite. {} attempts left", report.outcome.attempts);
                    }
                    if let Some(solution) = &report.outcome.solution {
                        println!("Solution: {}", solution);
                    }
                    for id in &report.unlocked {
                        println!("Achievement unlocked: {}", id);
                    }
                    if report.level_cleared {
                        println!("Level cleared! Type 'next' to continue.");
                    }
                }),
                None => {
                    println!("usage: answer <n>");
                    Ok(())
                }
            },
            "hint" => session.request_hint().map(|_| {
                for hint in session.hints().get_active_hints() {
                    println!(
                        "[{:?}] {}",
                        hint.hint_type,
                        hint.message.as_deref().unwrap_or("Look around!")
                    );
                }
            }),
            "tick" => {
                let seconds = argument.and_then(|s| s.parse().ok()).unwrap_or(1);
                println!("{} seconds left", session.tick(seconds));
                Ok(())
            }
            "next" => session.advance_level().map(|advance| match advance {
                LevelAdvance::Advanced { level_index, .. } => {
                    println!("Welcome to level {}", level_index + 1)
                }
                LevelAdvance::Locked { level_id } => println!("'{}' is still locked", level_id),
                LevelAdvance::GameCompleted { .. } => println!("You finished every level!"),
            }),
            "retry" => {
                session.retry_level();
                Ok(())
            }
            "pause" => {
                session.store_mut().pause_game();
                Ok(())
            }
            "resume" => {
                session.store_mut().resume_game();
                Ok(())
            }
            "status" => {
                print_summary(session);
                Ok(())
            }
            "quit" | "exit" => break,
            other => {
                println!("Unknown command '{}'. {}", other, HELP);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("{}", e);
        }
        if session.store().status() == SessionStatus::Completed {
            break;
        }
    }

    Ok(())
}

fn print_summary(session: &GameSession) {
    let state = session.store().state();
    println!(
        "Status: {:?} | Level {} | Score {} | Coins {} | Gems {} | XP {} (level {})",
        state.status(),
        state.level_index + 1,
        state.score,
        state.total_coins,
        state.gems,
        state.experience,
        state.experience_level
    );
    println!(
        "Answered {} ({:.0}% correct), treasures {}, hints {}",
        state.stats.questions_answered,
        state.stats.accuracy() * 100.0,
        state.stats.treasures_found,
        state.stats.hints_used
    );
}
