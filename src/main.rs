use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use sightread::{
    Answer, AnswerResult, AnswerStatus, Clef, DeleteOutcome, EngineConfig, EngineError, Level, LevelBuilder,
    LevelEdit, LevelId, NavigationHistory, Note, ProgressStore, Rng, Session, SessionSummary, TickResult,
};

/// Note-reading trainer: levels, progress and play sessions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the saved progress (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every level in order
    Levels,

    /// Show one level with its per-note history
    Show { level: usize },

    /// Play a level, answering from stdin
    Play {
        level: usize,

        /// Answer with note names like "F#4" as a MIDI keyboard would, instead of buttons
        #[arg(long)]
        midi: bool,

        /// Seed for reproducible questions
        #[arg(long)]
        seed: Option<u128>,
    },

    /// Add a custom question level
    Add {
        #[arg(short, long, default_value_t = 20)]
        questions: u32,

        /// Seconds for the whole session
        #[arg(short, long, default_value_t = 60)]
        timer: u32,

        #[arg(long, default_value = "treble")]
        clef: Clef,

        /// Notes such as C4 E4 G4
        #[arg(required = true)]
        notes: Vec<String>,
    },

    /// Add a custom sequence level
    AddSequence {
        #[arg(short, long, default_value_t = 5)]
        sequences: u32,

        #[arg(short = 'n', long, default_value_t = 3)]
        notes_per_sequence: u32,

        /// Seconds for each sequence
        #[arg(short, long, default_value_t = 30)]
        timer: u32,

        #[arg(long, default_value = "treble")]
        clef: Clef,

        #[arg(required = true)]
        notes: Vec<String>,
    },

    /// Change a level's settings
    Edit {
        level: usize,

        #[arg(short, long)]
        questions: Option<u32>,

        #[arg(short, long)]
        timer: Option<u32>,

        #[arg(short, long)]
        sequences: Option<u32>,

        #[arg(short = 'n', long)]
        notes_per_sequence: Option<u32>,
    },

    /// Delete a custom level
    Delete { level: usize },

    /// Forget scores, tries and statistics but keep the levels
    ResetHistory,

    /// Start over with only the default levels
    ResetAll,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let mut history = NavigationHistory::open(&config);
    let mut store = ProgressStore::open(config)?;

    match cli.command {
        Commands::Levels => {
            for (i, level) in store.levels().iter().enumerate() {
                println!("{}", describe(i + 1, level));
            }
        }
        Commands::Show { level } => {
            let id = level_id(&store, level)?;
            show(&store, level, id);
        }
        Commands::Play { level, midi, seed } => {
            let id = level_id(&store, level)?;
            let rng = seed.map(Rng::new_with_seed).unwrap_or_default();
            history.push(id);
            if let Err(e) = history.save() {
                log::warn!("could not save navigation history: {}", e);
            }
            play(&mut store, id, rng, midi)?;
        }
        Commands::Add {
            questions,
            timer,
            clef,
            notes,
        } => {
            let notes = parse_notes(&store, &notes, clef)?;
            let id = LevelBuilder::questions(questions, timer).notes(notes).add_to(&mut store)?;
            println!("added level {} ({})", store.len(), id);
        }
        Commands::AddSequence {
            sequences,
            notes_per_sequence,
            timer,
            clef,
            notes,
        } => {
            let notes = parse_notes(&store, &notes, clef)?;
            let id = LevelBuilder::sequences(sequences, notes_per_sequence, timer)
                .notes(notes)
                .add_to(&mut store)?;
            println!("added sequence level {} ({})", store.len(), id);
        }
        Commands::Edit {
            level,
            questions,
            timer,
            sequences,
            notes_per_sequence,
        } => {
            let id = level_id(&store, level)?;
            let edit = LevelEdit {
                number_of_questions: questions,
                timer,
                sequence_count: sequences,
                sequence_note_count: notes_per_sequence,
            };
            store.edit_level(id, edit)?;
            if let Some(edited) = store.level(id) {
                println!("{}", describe(level, edited));
            }
        }
        Commands::Delete { level } => {
            let id = level_id(&store, level)?;
            match store.delete_level(id) {
                DeleteOutcome::Deleted => println!("deleted level {}", level),
                DeleteOutcome::NotDeletable => println!("level {} can't be deleted", level),
                DeleteOutcome::InSession => println!("level {} is being played", level),
                DeleteOutcome::NotFound => println!("no level {}", level),
            }
        }
        Commands::ResetHistory => {
            store.reset_game_history()?;
            history.clear();
            history.save()?;
            println!("history cleared");
        }
        Commands::ResetAll => {
            store.reset_all()?;
            history.clear();
            history.save()?;
            println!("progress reset to the default levels");
        }
    }
    Ok(())
}

/// Levels are numbered from 1 on the command line
fn level_id(store: &ProgressStore, number: usize) -> Result<LevelId, EngineError> {
    number
        .checked_sub(1)
        .and_then(|i| store.levels().get(i))
        .map(Level::id)
        .ok_or_else(|| EngineError::InvalidLevel(format!("no level number {}", number)))
}

fn parse_notes(store: &ProgressStore, labels: &[String], clef: Clef) -> Result<Vec<Note>, EngineError> {
    labels.iter().map(|label| Note::parse(store.catalog(), label, clef)).collect()
}

fn note_list(level: &Level) -> String {
    level.notes().iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

fn describe(number: usize, level: &Level) -> String {
    let kind = match (level.is_free_level(), level.is_sequence()) {
        (false, _) => "level",
        (true, false) => "custom",
        (true, true) => "custom sequence",
    };
    let state = if !level.is_enabled() {
        "locked"
    } else if level.is_completed() {
        "done"
    } else {
        "open"
    };
    format!(
        "{:>3}. {:<15} {:<6} best {:>3}, tries {:>3}  [{}]",
        number,
        kind,
        state,
        level.max_score(),
        level.number_of_tries(),
        note_list(level)
    )
}

fn show(store: &ProgressStore, number: usize, id: LevelId) {
    let Some(level) = store.level(id) else {
        return;
    };
    println!("{}", describe(number, level));
    if level.is_sequence() {
        println!(
            "     {} sequences of {} notes, {}s each",
            level.sequence_count(),
            level.sequence_note_count(),
            level.timer()
        );
    } else {
        println!("     {} questions in {}s", level.number_of_questions(), level.timer());
    }
    for (note, score) in level.per_note_stats() {
        println!("     {:<5} right {:>4}  wrong {:>4}", note.to_string(), score.right, score.wrong);
    }
}

fn play(store: &mut ProgressStore, id: LevelId, rng: Rng, midi: bool) -> Result<(), EngineError> {
    let mut session = Session::start(store, id, rng)?;
    println!("p = pause/resume, r = restart, q = quit");
    if !midi {
        println!("buttons: {}", session.button_labels().join(" "));
    }
    prompt(&session);

    let mut last_tick = Instant::now();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| EngineError::io("<stdin>", e))?;

        while last_tick.elapsed() >= Duration::from_secs(1) {
            last_tick += Duration::from_secs(1);
            if let TickResult::Ended(summary) = session.tick(store) {
                println!("time is up");
                print_summary(&summary);
            }
        }
        if session.is_finished() {
            break;
        }

        match line.trim() {
            "" => {}
            "q" => {
                session.close(store);
                return Ok(());
            }
            "p" => {
                if !session.pause() {
                    session.resume();
                }
            }
            "r" => {
                session.reset(store)?;
                last_tick = Instant::now();
            }
            input => match to_answer(store, &session, input, midi) {
                Some(answer) => report(&session.submit(store, answer)),
                None => println!("'{}' is not an answer here", input),
            },
        }

        if session.is_finished() {
            break;
        }
        if let Some(pitch) = session.stray_notice() {
            println!("MIDI value {} is not part of this level; p to continue", pitch);
        }
        prompt(&session);
    }
    session.close(store);
    Ok(())
}

fn to_answer(store: &ProgressStore, session: &Session, input: &str, midi: bool) -> Option<Answer> {
    if midi {
        if let Ok(pitch) = input.parse() {
            return Some(Answer::Pitch(pitch));
        }
        let clef = session.level().notes().first().map(Note::clef).unwrap_or_default();
        return Note::parse(store.catalog(), input, clef)
            .ok()
            .map(|n| Answer::Pitch(n.pitch()));
    }
    session
        .button_labels()
        .iter()
        .position(|label| label.eq_ignore_ascii_case(input))
        .map(Answer::Button)
}

fn prompt(session: &Session) {
    if session.is_paused() {
        print!("(paused) > ");
    } else if session.is_sequence() {
        let sequence = session.current_sequence();
        let shown: Vec<_> = sequence.iter().map(|n| n.to_string()).collect();
        print!(
            "[{}s, {} left] {}  ({}/{}) > ",
            session.time_remaining(),
            session.sequences_remaining().unwrap_or(0),
            shown.join(" "),
            session.collected_answers(),
            sequence.len()
        );
    } else if let Some(note) = session.current_question() {
        print!(
            "[{}s, {} left] {} > ",
            session.time_remaining(),
            session.questions_remaining().unwrap_or(0),
            note
        );
    }
    let _ = io::stdout().flush();
}

fn report(result: &AnswerResult) {
    match result {
        AnswerResult::Judged { judgement, end } => {
            println!("{}", verdict(judgement.status, &judgement.expected));
            if let Some(summary) = end {
                print_summary(summary);
            }
        }
        AnswerResult::SequenceJudged { judgements, end } => {
            for judgement in judgements {
                println!("{}", verdict(judgement.status, &judgement.expected));
            }
            if let Some(summary) = end {
                print_summary(summary);
            }
        }
        AnswerResult::Buffered { .. } => {}
        AnswerResult::Rejected(reason) => println!("rejected: {:?}", reason),
        AnswerResult::Ignored(reason) => println!("ignored: {:?}", reason),
    }
}

fn verdict(status: AnswerStatus, expected: &Note) -> String {
    match status {
        AnswerStatus::Right => format!("right, {}", expected),
        AnswerStatus::Wrong => format!("wrong, it was {}", expected),
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("{:?}: {} right, {} wrong", summary.reason, summary.right, summary.wrong);
    for (note, score) in &summary.per_note {
        if score.total() > 0 {
            println!("  {:<5} {}/{}", note.to_string(), score.right, score.total());
        }
    }
    println!(
        "best {}, tries {}, completed: {}, next level: {:?}",
        summary.max_score, summary.number_of_tries, summary.level_completed, summary.unlock
    );
}
