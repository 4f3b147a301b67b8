//! Yolp CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use yolp_client::app::App;
use yolp_client::cli::{self, Command, USAGE};
use yolp_client::config::ClientConfig;
use yolp_client::confirm::ConfirmationGate;
use yolp_client::error::{AppError, AppResult};
use yolp_client::guard::RouteDecision;
use yolp_client::nav::Route;
use yolp_client::notifications::NotificationLevel;
use yolp_client::telemetry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let command = cli::parse_args(std::env::args().skip(1))?;
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = ClientConfig::load()?;
    telemetry::init_tracing(&config.log)?;
    let app = App::from_config(&config)?;

    let result = execute(&app, command).await;
    for notification in app.notifications.drain() {
        match notification.level {
            NotificationLevel::Error | NotificationLevel::Warning => {
                eprintln!("{}", notification.message)
            }
            NotificationLevel::Info | NotificationLevel::Success => {
                println!("{}", notification.message)
            }
        }
    }
    app.dispose();
    result
}

async fn execute(app: &App, command: Command) -> AppResult<()> {
    match command {
        Command::Help => println!("{USAGE}"),
        Command::WhoAmI => {
            let identity = app.queries.current_identity().await;
            match identity.display_name() {
                Some(name) => println!("{name}"),
                None => println!("Not signed in"),
            }
        }
        Command::List => {
            if allowed(app, Route::Home).await {
                print_lines(app.queries.restaurants_settled().await.lines());
            }
        }
        Command::Show(id) => {
            if allowed(app, Route::Restaurant(id)).await {
                print_lines(app.queries.restaurant_settled(id).await.lines());
            }
        }
        Command::Add(restaurant) => {
            if allowed(app, Route::Home).await {
                if let Some(created) = app.commands.add_restaurant(restaurant).await? {
                    println!("#{} {}", created.id, created.name);
                }
            }
        }
        Command::SignIn(request) => {
            if allowed(app, Route::SignIn).await {
                app.commands.sign_in(request).await?;
            }
        }
        Command::SignUp(request) => {
            if allowed(app, Route::SignUp).await {
                app.commands.sign_up(request).await?;
            }
        }
        Command::SignOut => {
            if allowed(app, Route::Home).await {
                let surface = tokio::spawn(answer_from_stdin(app.gate.clone()));
                let signed_out = app.commands.sign_out().await;
                surface.abort();
                if !signed_out? {
                    println!("Cancelled");
                }
            }
        }
    }
    Ok(())
}

/// Resolve the guard for `route`, explaining any redirect.
async fn allowed(app: &App, route: Route) -> bool {
    match app.guard.resolve(route).await {
        RouteDecision::Render => true,
        RouteDecision::Redirect(Route::SignIn) => {
            eprintln!("Not signed in. Run `yolp sign-in <email> <password>` first.");
            false
        }
        RouteDecision::Redirect(_) => {
            eprintln!("Already signed in. Run `yolp sign-out` first.");
            false
        }
        RouteDecision::Wait => false,
    }
}

/// Stdin-backed decision surface: shows the pending prompt and reads y/N.
async fn answer_from_stdin(gate: ConfirmationGate) {
    let mut prompts = gate.subscribe();
    let closed = prompts.wait_for(Option::is_some).await.is_err();
    if closed {
        return;
    }
    let Some(surface) = gate.surface() else {
        return;
    };

    let prompt = surface.prompt();
    print!("{}: {} [y/N] ", prompt.title, prompt.description);
    let _ = std::io::stdout().flush();

    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await;

    match answer {
        Ok(Ok(line)) if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") => {
            surface.confirm();
        }
        // Anything else, including a closed stdin, drops the surface and cancels.
        _ => {}
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
