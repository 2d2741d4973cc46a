//! Pokemon battle TUI

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokebattle::action::Action;
use pokebattle::api::{self, HttpApi, PokemonApi, DEFAULT_API_URL};
use pokebattle::effect::Effect;
use pokebattle::reducer::{reducer, COUNTER_ATTACK_DELAY_MS};
use pokebattle::state::AppState;
use pokebattle::ui;

#[derive(Parser, Debug)]
#[command(name = "pokebattle")]
#[command(about = "Turn-based Pokemon battles against a capture backend")]
struct Args {
    /// Backend base URL (falls back to POKEBATTLE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Log in with these credentials before the first battle
    #[arg(long, requires = "password")]
    username: Option<String>,

    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Seed for damage and heal rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Write diagnostics to this file (filter with RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_ref() {
        init_logging(path)?;
    }

    let api_url = args
        .api_url
        .clone()
        .or_else(|| std::env::var("POKEBATTLE_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = HttpApi::new(api_url.clone())
        .map_err(|e| io::Error::other(e.to_string()))?
        .with_token(std::env::var("POKEBATTLE_TOKEN").ok());
    let client = match (&args.username, &args.password) {
        (Some(username), Some(password)) => match client.login(username, password).await {
            Ok(token) => {
                tracing::info!(%username, "logged in");
                client.with_token(Some(token))
            }
            Err(e) => {
                eprintln!("Error: could not log in to {api_url}.");
                eprintln!("Details: {e}");
                std::process::exit(1);
            }
        },
        _ => client,
    };
    tracing::info!(%api_url, authenticated = client.has_token(), "starting");
    let client: Arc<dyn PokemonApi> = Arc::new(client);

    let debug = DebugSession::new(args.debug);
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let seed = args.seed;
    let state = debug
        .load_state_or_else_async(|| async move {
            let state = match seed {
                Some(seed) => AppState::with_seed(seed),
                None => AppState::new(),
            };
            Ok::<AppState, io::Error>(state)
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, client).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn init_logging(path: &PathBuf) -> io::Result<()> {
    let file = File::create(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pokebattle=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    client: Arc<dyn PokemonApi>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(100), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, client.clone()),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, client: Arc<dyn PokemonApi>) {
    match effect {
        Effect::FetchCombatants => {
            ctx.tasks()
                .spawn(TaskKey::new("fetch_combatants"), async move {
                    match api::fetch_combatants(client.as_ref()).await {
                        Ok((player, enemy)) => {
                            tracing::info!(player = %player.name, enemy = %enemy.name, "combatants loaded");
                            Action::CombatantsDidLoad { player, enemy }
                        }
                        Err(error) => {
                            tracing::warn!(%error, "failed to fetch combatants");
                            Action::CombatantsDidError(error.to_string())
                        }
                    }
                });
        }
        Effect::ScheduleCounterAttack { session } => {
            ctx.tasks().debounce(
                "counter_attack",
                Duration::from_millis(COUNTER_ATTACK_DELAY_MS),
                async move { Action::BattleCounterAttack { session } },
            );
        }
        Effect::SubmitCapture { session, name } => {
            ctx.tasks().spawn(TaskKey::new(format!("capture_{session}")), async move {
                match client.capture(&name).await {
                    Ok(receipt) => {
                        tracing::info!(%name, message = ?receipt.message, "capture accepted");
                        Action::CaptureDidSucceed { session, name }
                    }
                    Err(error) => {
                        tracing::warn!(%name, %error, "capture failed");
                        Action::CaptureDidFail {
                            session,
                            name,
                            error: error.to_string(),
                        }
                    }
                }
            });
        }
    }
}
