use clap::Parser;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use std::sync::mpsc::channel;
use std::sync::Arc;
use tabq::api::ApiClient;
use tabq::telemetry::{HttpReporter, NullReporter, Reporter};
use tabq::{App, AppConfig, AppEvent, CacheManager, ConfigManager};

#[derive(Parser, Debug)]
#[command(version, about = "tabq")]
struct Args {
    /// Base URL of the tabular-data service (overrides the config file)
    #[arg(long = "server")]
    server: Option<String>,

    /// Disable usage event reporting for this run
    #[arg(long = "no-telemetry", action)]
    no_telemetry: bool,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    debug: bool,

    /// Clear all input history and exit
    #[arg(long = "clear-history", action)]
    clear_history: bool,

    /// Write the default config file and exit
    #[arg(long = "init-config", action)]
    init_config: bool,
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: &AppConfig) -> Result<()> {
    let server_url = args
        .server
        .clone()
        .unwrap_or_else(|| config.server.url.clone());
    let api = ApiClient::new(server_url);

    let reporter: Arc<dyn Reporter> = if args.no_telemetry || !config.telemetry.enabled {
        Arc::new(NullReporter)
    } else {
        Arc::new(HttpReporter::new(api.base_url()))
    };

    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(tx.clone(), api, reporter, config);
    if args.debug {
        app.enable_debug();
    }
    render(&mut terminal, &mut app)?;

    let poll_interval = std::time::Duration::from_millis(config.ui.event_poll_interval_ms);
    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    event => {
                        if let Some(event) = app.event(event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_history {
        match CacheManager::new(tabq::APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing history: {}", e);
                    std::process::exit(1);
                }
                println!("Input history cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No history to clear");
                return Ok(Some(()));
            }
        }
    }

    if args.init_config {
        match ConfigManager::new(tabq::APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(false) {
                Ok(path) => {
                    println!("Default config written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = AppConfig::load(tabq::APP_NAME)?;

    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = run(terminal, &args, &config);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
