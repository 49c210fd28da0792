use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use taskflow_terminal_ui::api::HttpTaskApi;
use taskflow_terminal_ui::app::{App, AppEvent};
use taskflow_terminal_ui::config::Config;
use taskflow_terminal_ui::ui::{self, Screen};
use tokio::sync::mpsc;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

async fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut screen = Screen::default();
    let mut input = EventStream::new();

    terminal.draw(|f| ui::draw(f, app, &screen))?;
    app.load().await;

    loop {
        screen.clamp(app.tasks().len());
        terminal.draw(|f| ui::draw(f, app, &screen))?;

        tokio::select! {
            Some(event) = events.recv() => app.handle_event(event),
            next = input.next() => match next {
                Some(Ok(Event::Key(key))) => {
                    let action = screen.on_key(key, &app.tasks());
                    if ui::dispatch(app, action) {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_logging(&config.log_file)?;
    log::info!("using server at {}", config.server_url);

    let api = Arc::new(HttpTaskApi::new(config.server_url.clone()));
    let (mut app, mut events) = App::new(api);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        log::error!("{err}");
    }
    result
}
