use std::{
    fs::File,
    io::BufReader,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{Router, routing::get};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trivia::{
    bank::QuestionBank,
    constants::session::EVENT_CHANNEL_CAPACITY,
    game::Game,
    server::{AppState, net, runtime},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("TRIVIA_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(3000);
    let questions_path =
        std::env::var("TRIVIA_QUESTIONS").unwrap_or_else(|_| "questions.json".to_owned());

    // Startup fails outright on a missing, malformed, or empty bank;
    // there is no degraded mode without questions.
    let bank = QuestionBank::from_reader(BufReader::new(File::open(&questions_path)?))?;
    info!(path = %questions_path, questions = bank.len(), "loaded question bank");

    let game = Game::new(bank)?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(runtime::game_task(game, events_tx.clone(), events_rx));

    let state = Arc::new(AppState { events: events_tx });
    let app = Router::new()
        .route("/ws", get(net::ws_handler))
        .with_state(state);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
