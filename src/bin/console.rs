use dotenv::dotenv;
use log::{error, info};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use like_her::client::ApiClient;
use like_her::config::Config;
use like_her::services::calculations::{summarize, StockSummary};
use like_her::session::ChatSession;

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Chat(&'a str),
    News,
    Health,
    Stocks { symbol: &'a str, period: &'a str },
    Clear,
    Quit,
    Unknown(&'a str),
    Empty,
}

fn parse(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Chat(line);
    }
    let mut words = line.split_whitespace();
    match words.next().unwrap_or_default() {
        "/news" => Command::News,
        "/health" => Command::Health,
        "/stocks" => Command::Stocks {
            symbol: words.next().unwrap_or("7974.T"),
            period: words.next().unwrap_or("1mo"),
        },
        "/clear" => Command::Clear,
        "/quit" | "/exit" => Command::Quit,
        other => Command::Unknown(other),
    }
}

fn stock_block(name: &str, s: &StockSummary) -> String {
    format!(
        "{} ({})\nLatest: {}\nClose: {:.2}\nChange: {:+.2}%\nRange: {:.2} - {:.2}",
        s.symbol, name, s.latest_date, s.latest_close, s.change_pct, s.range_low, s.range_high
    )
}

async fn say(out: &mut io::Stdout, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let client = ApiClient::new(&config.api_url);
    info!("Console connected to {}", client.base_url());

    let mut session = ChatSession::with_greeting();
    let mut out = io::stdout();
    for turn in session.history() {
        say(&mut out, &turn.content).await?;
    }
    say(&mut out, "Commands: /news /health /stocks [SYMBOL] [PERIOD] /clear /quit").await?;

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Command::Empty => {}
            Command::Chat(text) => {
                let reply = session.submit(&client, text).await;
                say(&mut out, &reply).await?;
            }
            Command::News => match client.news().await {
                Ok(items) => {
                    for item in items {
                        let line = format!(
                            "* {} ({}, {})\n  {}",
                            item.title, item.source, item.date, item.summary
                        );
                        say(&mut out, &line).await?;
                    }
                }
                Err(e) => {
                    error!("Error fetching news: {:#}", e);
                    say(&mut out, &format!("Could not load news: {}", e)).await?;
                }
            },
            Command::Health => match client.health().await {
                Ok(h) => {
                    say(
                        &mut out,
                        &format!(
                            "Steps: {}\nSleep: {:.1} h\nHeart rate: {} bpm\nLast sync: {}",
                            h.steps, h.sleep_hours, h.heart_rate, h.last_sync
                        ),
                    )
                    .await?
                }
                Err(e) => {
                    error!("Error fetching health data: {:#}", e);
                    say(&mut out, &format!("Could not load health data: {}", e)).await?;
                }
            },
            Command::Stocks { symbol, period } => match client.stocks(symbol, period).await {
                Ok(series) => match summarize(&series) {
                    Some(s) => say(&mut out, &stock_block(&series.name, &s)).await?,
                    None => say(&mut out, &format!("No data for {}", symbol)).await?,
                },
                Err(e) => {
                    error!("Error fetching stock data: {:#}", e);
                    say(&mut out, &format!("Could not load {}: {}", symbol, e)).await?;
                }
            },
            Command::Clear => {
                session.clear();
                say(&mut out, "Conversation cleared.").await?;
            }
            Command::Quit => break,
            Command::Unknown(cmd) => say(&mut out, &format!("Unknown command {}", cmd)).await?,
        }
    }

    Ok(())
}
