use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use fliprush::config::Config;
use fliprush::engine::levels::{self, Mode, RouteParams};
use fliprush::event::{AppEvent, EventHandler};
use fliprush::generator::quiz_bank::{MIXED_TOPIC, QuizBank, QuizTopic};
use fliprush::session::input::parse_command;
use fliprush::session::result::QuizVerdict;
use fliprush::session::{GameSession, Phase, SessionSnapshot};
use fliprush::store::{JsonStore, KvStore, ProgressStore};

const TICK_RATE: Duration = Duration::from_millis(100);
const ENDLESS_COLUMNS: usize = 4;

#[derive(Parser)]
#[command(name = "fliprush", version, about = "Memory-matching card game with quiz challenges")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a level, an endless run or the knowledge test
    Play {
        #[arg(short, long, help = "Level to play (defaults to the highest unlocked)")]
        level: Option<u32>,

        #[arg(long, conflicts_with_all = ["level", "knowledge"], help = "Untimed endless mode")]
        endless: bool,

        #[arg(long, conflicts_with = "level", help = "Answer every question in the bank")]
        knowledge: bool,

        #[arg(short, long, help = "Boss quiz topic, skips topic selection")]
        topic: Option<String>,
    },
    /// List levels with their grid, time and lock state
    Levels,
    /// List quiz topics
    Topics,
    /// Show saved progress
    Progress,
    /// Turn sound on or off, or flip it
    Sound { state: Toggle },
    /// Clear saved progress
    Reset,
    /// Print the effective configuration
    Config {
        #[arg(long, help = "Write it to the config file")]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
    Toggle,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let data_dir = config.data_dir();
    let mut store = JsonStore::with_base_dir(data_dir.clone())?;
    log::debug!("data dir {}", data_dir.display());

    match cli.command.unwrap_or(Command::Play {
        level: None,
        endless: false,
        knowledge: false,
        topic: None,
    }) {
        Command::Play {
            level,
            endless,
            knowledge,
            topic,
        } => {
            let bank = Arc::new(QuizBank::load(Some(&data_dir.join("quiz"))));
            let progress = ProgressStore::new(&mut store);
            let mode = if endless {
                Mode::Endless
            } else if knowledge {
                Mode::KnowledgeTest
            } else {
                let level = level.unwrap_or_else(|| progress.highest_level_unlocked());
                if !progress.is_level_unlocked(level) {
                    bail!(
                        "level {level} is locked (highest unlocked: {})",
                        progress.highest_level_unlocked()
                    );
                }
                Mode::from_route_level(level)
            };
            let mut params = RouteParams::new(mode);
            if let Some(topic) = topic {
                if !bank.has_topic(&QuizTopic::parse(&topic)) {
                    bail!("unknown topic '{topic}'");
                }
                params = params.with_topic(&topic);
            }
            let mut session = GameSession::new(&params, config, progress, bank);
            let events = EventHandler::new(TICK_RATE);
            run_session(&mut session, &events)?;
        }
        Command::Levels => {
            let progress = ProgressStore::new(&mut store);
            for level in levels::all_levels(&config) {
                let lock = if progress.is_level_unlocked(level.id) {
                    " "
                } else {
                    "x"
                };
                println!(
                    "[{lock}] level {:>2}  {}x{}  {:>3}s",
                    level.id, level.rows, level.cols, level.time_seconds
                );
            }
        }
        Command::Topics => {
            let bank = QuizBank::load(Some(&data_dir.join("quiz")));
            for topic in bank.topics() {
                let count = bank.topic_len(&QuizTopic::parse(topic));
                println!("{topic:<12} {count:>3} questions");
            }
            println!("{MIXED_TOPIC:<12} {:>3} questions", bank.len());
        }
        Command::Progress => {
            let bank = QuizBank::load(Some(&data_dir.join("quiz")));
            print_progress(&ProgressStore::new(&mut store), &bank, &data_dir);
        }
        Command::Sound { state } => {
            let mut progress = ProgressStore::new(&mut store);
            let enabled = match state {
                Toggle::On => {
                    progress.set_sound_enabled(true)?;
                    true
                }
                Toggle::Off => {
                    progress.set_sound_enabled(false)?;
                    false
                }
                Toggle::Toggle => progress.toggle_sound()?,
            };
            println!("sound {}", on_off(enabled));
        }
        Command::Reset => {
            ProgressStore::new(&mut store).reset()?;
            println!("progress cleared");
        }
        Command::Config { save } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if save {
                config.save()?;
                println!("# saved to {}", Config::config_path().display());
            }
        }
    }

    Ok(())
}

fn run_session<S: KvStore>(session: &mut GameSession<S>, events: &EventHandler) -> Result<()> {
    print_help();
    let mut last = Instant::now();
    let mut shown = render_key(&session.snapshot());
    render(&session.snapshot());

    loop {
        let event = events.next()?;
        let now = Instant::now();
        let elapsed = u64::try_from(now.duration_since(last).as_millis()).unwrap_or(u64::MAX);
        session.advance_time(elapsed);
        last = now;

        match event {
            AppEvent::Line(line) => {
                let line = line.trim();
                if line.is_empty() {
                    render(&session.snapshot());
                    continue;
                }
                if line == "?" || line == "help" {
                    print_help();
                    continue;
                }
                match parse_command(line) {
                    Some(event) => {
                        if !session.handle(event) {
                            println!("(not available right now)");
                        }
                    }
                    None => println!("unknown command, type ? for help"),
                }
            }
            AppEvent::Tick => {}
            AppEvent::Eof => {
                session.abandon();
            }
        }

        let snapshot = session.snapshot();
        let key = render_key(&snapshot);
        if key != shown {
            render(&snapshot);
            shown = key;
        }
        if snapshot.phase == Phase::Finished {
            break;
        }
    }
    Ok(())
}

type RenderKey = (u32, Phase, usize, usize, u32, Option<u32>, Option<(usize, u32)>);

/// Everything that warrants a redraw. Countdowns redraw every ten seconds,
/// then every second near the end.
fn render_key(s: &SessionSnapshot) -> RenderKey {
    let time = s.time_left.map(|t| if t <= 5 { t } else { 100 + t / 10 });
    let question = s
        .interstitial
        .as_ref()
        .or(s.boss_quiz.as_ref())
        .map(|q| (q.index, q.seconds_left.min(4)));
    (
        s.epoch,
        s.phase,
        s.face_up_unmatched(),
        s.matched_count,
        s.score,
        time,
        question,
    )
}

fn render(s: &SessionSnapshot) {
    println!();
    let title = match s.level {
        Some(level) => format!("Level {}", level.id),
        None => s.mode.as_str().to_string(),
    };
    let clock = s
        .time_left
        .map_or_else(|| "--".to_string(), |t| format!("{t}s"));
    println!(
        "== {title} | {} | time {clock} | score {} | pairs {} | sound {} ==",
        s.phase.as_str(),
        s.score,
        s.pairs_matched,
        on_off(s.sound_enabled)
    );

    match s.phase {
        Phase::Playing => render_grid(s),
        Phase::QuizInterstitial => {
            if let Some(q) = &s.interstitial {
                println!("Bonus question ({}s): {}", q.seconds_left, q.text);
                print_options(&q.options);
            }
        }
        Phase::BossQuiz => {
            if let Some(q) = &s.boss_quiz {
                println!(
                    "Question {}/{} ({}s, {} correct): {}",
                    q.index + 1,
                    q.total,
                    q.seconds_left,
                    q.correct_so_far,
                    q.text
                );
                print_options(&q.options);
            }
        }
        Phase::TopicSelect => {
            println!("Board cleared! Pick a boss quiz topic with `t <name>`:");
            println!("  {}", s.topics_offered.join(", "));
        }
        Phase::Lost => println!("Out of time. `r` to retry, `q` to quit."),
        Phase::BossResult => {
            if let Some(result) = &s.last_result {
                println!(
                    "Quiz: {}/{} ({:.0}%)",
                    result.correct,
                    result.total,
                    result.accuracy()
                );
                match result.verdict {
                    QuizVerdict::Passed => println!("Passed! `n` for the next level, `r` to replay."),
                    QuizVerdict::Failed if result.retries_left > 0 => println!(
                        "Failed. `r` to try again ({} retries left).",
                        result.retries_left
                    ),
                    QuizVerdict::Failed => println!("Failed, no retries left. `r` replays the level."),
                    QuizVerdict::Complete => println!(
                        "{} newly mastered. `r` for another run, `q` to quit.",
                        result.newly_mastered
                    ),
                }
            }
        }
        Phase::Building | Phase::Finished => {}
    }
}

fn render_grid(s: &SessionSnapshot) {
    let cols = s
        .level
        .map_or(ENDLESS_COLUMNS, |level| level.cols as usize)
        .max(1);
    for row in s.cards.chunks(cols) {
        let cells: Vec<String> = row
            .iter()
            .map(|card| {
                if card.matched {
                    format!("{:^8}", "--")
                } else if card.flipped {
                    format!("{:^8}", card.symbol.as_str())
                } else {
                    format!("[{:^6}]", card.id)
                }
            })
            .collect();
        println!("  {}", cells.join(" "));
    }
}

fn print_options(options: &[String]) {
    for (i, option) in options.iter().enumerate() {
        println!("  {i}) {option}");
    }
}

fn print_progress<S: KvStore>(progress: &ProgressStore<S>, bank: &QuizBank, data_dir: &Path) {
    let data = progress.snapshot();
    println!("highest level unlocked: {}", data.highest_level_unlocked);
    println!(
        "questions mastered:     {}/{}",
        data.mastered_questions.len(),
        bank.len()
    );
    println!("sound:                  {}", on_off(data.sound_enabled));
    println!("data dir:               {}", data_dir.display());
}

fn print_help() {
    println!("commands: f <id> flip | a <n> answer | t <topic> | n next | r retry | q quit | ? help");
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
