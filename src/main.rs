use anyhow::{Context, Result};
use clap::Parser;
use covid_map::data::boundaries::AssetBoundaries;
use covid_map::data::cases::BrasilIoClient;
use covid_map::data::BaseMap;
use covid_map::loader::Loader;
use covid_map::{ui, App, Cli, Config, Interaction};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Input poll interval, roughly 60 fps
const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;
    init_logging(&config)?;
    info!(state = %config.initial_state, api = %config.api_base, assets = %config.assets.display(), "starting");

    let cases = BrasilIoClient::new(&config.api_base, config.api_token.clone(), config.timeout)
        .context("Failed to build HTTP client")?;
    let boundaries = AssetBoundaries::new(&config.assets);
    let loader = Loader::new(Arc::new(cases), Arc::new(boundaries))
        .context("Failed to start fetch workers")?;
    let base_map = BaseMap::load_or_default(&config.assets);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, loader, base_map);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    info!("exiting");
    result
}

fn init_logging(config: &Config) -> Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("Failed to create log file: {}", config.log_file.display()))?;
    fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COVID_MAP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Handle mouse events: hover, click, drag to pan, wheel to zoom
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.on_mouse_move(mouse.column, mouse.row),
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.on_left_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => {
            app.on_left_up(mouse.column, mouse.row, Instant::now())
        }
        _ => {}
    }
}

/// Keyboard bindings. Only presses are handled, not releases or repeats.
fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Esc => app.dispatch(Interaction::Unlock),

        KeyCode::Tab | KeyCode::Char('n') => app.select_state(app.state.next()),
        KeyCode::BackTab | KeyCode::Char('p') => app.select_state(app.state.prev()),
        KeyCode::F(5) => app.reload(),

        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -8),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 8),
        KeyCode::Char('+' | '=') => app.zoom_in(),
        KeyCode::Char('-' | '_') => app.zoom_out(),
        KeyCode::Char('r' | '0') => app.frame_state(),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config, loader: Loader, base_map: BaseMap) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config.initial_state, loader, base_map, size.width, size.height);
    app.select_state(config.initial_state);

    while !app.should_quit {
        // Fetch results land between frames; the UI thread owns all view state.
        app.pump();
        app.prepare_frame();
        terminal.draw(|frame| ui::render(frame, &app))?;

        if !event::poll(FRAME)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => handle_key(&mut app, key),
            Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
            Event::Resize(width, height) => app.resize(width, height),
            _ => {}
        }
    }

    Ok(())
}
