use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

mod app;
mod cache;
mod cli;
mod dispatch;
mod duration;
mod error;
mod logging;
mod models;
mod protocol;
mod router;
mod session;
mod storage;
#[cfg(test)]
mod testing;
mod toggl;
mod ui;

use app::App;
use cli::{Cli, Commands};
use protocol::HostResponse;
use session::Session;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let preferences = storage::read_preferences(cli.config.as_deref());

    // Logging is best effort; the launcher works without it.
    if let Err(err) = logging::init(preferences.log_file.as_deref()) {
        eprintln!("togglaunch: logging disabled: {err}");
    }

    let mut session = Session::from_preferences(&preferences);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            protocol::run(&mut session, stdin.lock(), stdout.lock())?;
        }
        Commands::Query { json, text } => print_query(&mut session, &text.join(" "), json)?,
        Commands::Tui => run_tui(session, cli.config.as_deref())?,
    }

    Ok(())
}

fn print_query(session: &mut Session, text: &str, json: bool) -> Result<(), Box<dyn Error>> {
    let options = session.query(text);
    let mut stdout = io::stdout().lock();
    if json {
        let response = HostResponse::render(options);
        writeln!(stdout, "{}", serde_json::to_string_pretty(&response)?)?;
        return Ok(());
    }
    for option in options {
        let marker = if option.action.is_some() { "›" } else { " " };
        writeln!(stdout, "{marker} {}", option.title)?;
        if let Some(description) = option.description {
            writeln!(stdout, "    {description}")?;
        }
    }
    Ok(())
}

fn run_tui(session: Session, config_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(session, config_path.map(Path::to_path_buf));

    loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if app.needs_query {
            app.run_query();
            continue;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key_event(key);
            }
        }
    }

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
