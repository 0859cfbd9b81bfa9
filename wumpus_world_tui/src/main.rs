use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wumpus_world_core::{
    AllowDuplicates, Entity, Observation, RejectDuplicates, WorldConfig, WorldSnapshot,
    WumpusWorld,
    agent::{CautiousPolicy, Policy, RandomPolicy},
    placement::parse_layout,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    Random,
    Cautious,
}

#[derive(Parser, Debug)]
#[command(version, about = "Watch a baseline agent explore a Wumpus world", long_about = None)]
struct Args {
    /// JSON world config; flags below override its fields
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Fixed layout map (`.` empty, `W` wumpus, `G` gold, `P` pit)
    #[arg(short, long, value_name = "LAYOUT_FILE", conflicts_with_all = ["size", "pits", "distinct"])]
    layout: Option<PathBuf>,

    /// Board side length
    #[arg(long)]
    size: Option<usize>,

    /// Number of pits
    #[arg(long)]
    pits: Option<usize>,

    /// Arrows per episode
    #[arg(long)]
    charges: Option<u32>,

    /// Seed for entity placement and the policy
    #[arg(long)]
    seed: Option<u64>,

    /// Place every entity on its own cell
    #[arg(long)]
    distinct: bool,

    #[arg(long, value_enum, default_value_t = PolicyKind::Cautious)]
    policy: PolicyKind,

    /// Milliseconds between steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Write logs to this file (filtered by RUST_LOG, default `info`)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    /// The core simulation environment.
    world: WumpusWorld,
    policy: Box<dyn Policy>,
    observation: Observation,
    last_reward: Option<i32>,
    episode: usize,
    episode_reward: i64,
    total_reward: i64,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(mut world: WumpusWorld, policy: Box<dyn Policy>) -> Self {
        let observation = world.reset();
        App {
            world,
            policy,
            observation,
            last_reward: None,
            episode: 1,
            episode_reward: 0,
            total_reward: 0,
            should_quit: false,
        }
    }

    fn start_episode(&mut self) {
        self.observation = self.world.reset();
        self.policy.reset();
        self.episode += 1;
        self.episode_reward = 0;
        self.last_reward = None;
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.world.is_terminated() {
            info!(episode = self.episode, reward = self.episode_reward, "episode over");
            self.start_episode();
            return Ok(());
        }
        let action = self.policy.act(&self.observation);
        let transition = self.world.step(action)?;
        self.observation = transition.observation;
        self.last_reward = Some(transition.reward);
        self.episode_reward += i64::from(transition.reward);
        self.total_reward += i64::from(transition.reward);
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let world = build_world(&args, seed)?;
    let policy: Box<dyn Policy> = match args.policy {
        PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
        PolicyKind::Cautious => Box::new(CautiousPolicy::new(seed)),
    };
    info!(seed, policy = ?args.policy, "starting wumpus world");
    let mut app = App::new(world, policy);

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main loop, then restore the terminal even if it failed
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
}

/// Sends tracing output to `path`; stdout belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Builds the world from the config file, CLI overrides and an optional layout map.
fn build_world(args: &Args, seed: u64) -> Result<WumpusWorld> {
    let config_json = match &args.config {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
        ),
        None => None,
    };
    let layout_map = match &args.layout {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout file {}", path.display()))?,
        ),
        None => None,
    };
    assemble_world(args, config_json.as_deref(), layout_map.as_deref(), seed)
}

/// Applies CLI overrides on top of the JSON config. A layout map fixes the board size
/// and the pits; every other field still comes from the config and the flags.
fn assemble_world(
    args: &Args,
    config_json: Option<&str>,
    layout_map: Option<&str>,
    seed: u64,
) -> Result<WumpusWorld> {
    let mut config = match config_json {
        Some(json) => WorldConfig::from_json_str(json)?,
        None => WorldConfig::default(),
    };
    if let Some(size) = args.size {
        config = config.with_size(size);
    }
    if let Some(pits) = args.pits {
        config = config.with_hazard_count(pits);
    }
    if let Some(charges) = args.charges {
        config = config.with_max_charges(charges);
    }

    if let Some(map) = layout_map {
        let (size, layout) = parse_layout(map)?;
        return Ok(WumpusWorld::with_layout(config.with_size(size), layout)?);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let world = if args.distinct {
        WumpusWorld::with_strategy(config, &RejectDuplicates, &mut rng)?
    } else {
        WumpusWorld::with_strategy(config, &AllowDuplicates, &mut rng)?
    };
    Ok(world)
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for events; only quitting is handled
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    app.quit();
                }
            }
        }

        // Update application state if enough time has passed
        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Area for the board
            Constraint::Percentage(20), // Area for sensors and score
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_board(frame, main_layout[0], &app.world.snapshot());
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the sensors, rewards and episode counters.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let obs = &app.observation;
    let flag = |on: bool, label: &'static str, color: Color| {
        if on {
            Span::styled(label, Style::default().fg(color).bold())
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };
    let reward = match app.last_reward {
        Some(r) => r.to_string(),
        None => "-".to_string(),
    };
    let state = if app.world.is_terminated() {
        Span::styled("episode over", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("exploring")
    };

    let lines = vec![
        Line::from(vec![
            Span::raw(format!(
                "Pos: ({}, {})  Arrows: {}  ",
                obs.row, obs.col, obs.charges
            )),
            flag(obs.breeze, "breeze ", Color::Cyan),
            flag(obs.stench, "stench", Color::Magenta),
        ]),
        Line::from(format!(
            "Episode: {}  Last reward: {}  Episode reward: {}  Total reward: {}",
            app.episode, reward, app.episode_reward, app.total_reward
        )),
        Line::from(state),
    ];

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Agent"));
    frame.render_widget(status, area);
}

/// Renders the board, one character per cell.
fn render_board(frame: &mut Frame, area: Rect, snapshot: &WorldSnapshot) {
    let cells = snapshot.to_grid();
    let mut lines: Vec<Line> = Vec::with_capacity(cells.rows());

    for row in 0..cells.rows() {
        let mut spans: Vec<Span> = Vec::with_capacity(cells.cols());
        for col in 0..cells.cols() {
            let span = match cells[(row, col)] {
                Some(Entity::Agent) => Span::styled("@", Style::default().fg(Color::Red).bold()),
                Some(Entity::Wumpus) => Span::styled("W", Style::default().fg(Color::Magenta)),
                Some(Entity::Gold) => Span::styled("$", Style::default().fg(Color::Yellow)),
                Some(Entity::Pit) => Span::styled("O", Style::default().fg(Color::DarkGray)),
                None => Span::raw("."),
            };
            spans.push(span);
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let board = Paragraph::new(lines)
        .block(Block::default().title("Wumpus World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(board, area);
}
