//! Stackduel runner (default binary).
//!
//! Headless: every seat is played by the heuristic opponent and results are
//! reported through `tracing`. Rendering and menus live elsewhere.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stackduel::battle::{Battle, HeuristicOpponent, PlayerId, Winner};
use stackduel::core::{unix_ms, AttackQueue, SimpleRng};
use stackduel::net::{
    announce_match, await_match, await_ready, NetLink, PeerLink, RemoteDuel, Role, SessionConfig,
};
use stackduel::types::{Difficulty, GameMode, Settings, TICK_MS};

/// Two-player block stacking with attack lines
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Play a local match between two heuristic opponents
    Local(LocalArgs),
    /// Wait for a peer and play a networked match
    Host(HostArgs),
    /// Connect to a host and play a networked match
    Join(JoinArgs),
}

#[derive(Debug, Clone, Args)]
struct MatchArgs {
    /// easy | normal | hard
    #[arg(long)]
    difficulty: Option<String>,

    /// normal | item | timelimit
    #[arg(long)]
    mode: Option<String>,

    /// Match length in seconds for the time-limit mode
    #[arg(long)]
    time_limit: Option<u64>,

    /// RNG seed (defaults to the clock)
    #[arg(long)]
    seed: Option<u32>,
}

impl MatchArgs {
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::from_env();
        if let Some(difficulty) = &self.difficulty {
            let Some(difficulty) = Difficulty::from_str(difficulty) else {
                bail!("unknown difficulty: {difficulty}");
            };
            settings.difficulty = difficulty;
        }
        if let Some(mode) = &self.mode {
            let Some(mode) = GameMode::from_str(mode) else {
                bail!("unknown game mode: {mode}");
            };
            settings.game_mode = mode;
        }
        if let Some(secs) = self.time_limit {
            settings.time_limit_secs = secs;
        }
        Ok(settings)
    }

    fn rng(&self) -> SimpleRng {
        SimpleRng::new(self.seed.unwrap_or(unix_ms() as u32))
    }
}

#[derive(Debug, Args)]
struct LocalArgs {
    #[command(flatten)]
    game: MatchArgs,

    /// Stop after this many ticks even without a winner
    #[arg(long, default_value_t = 100_000)]
    ticks: u32,

    /// Pace the match in real time instead of simulating as fast as possible
    #[arg(long)]
    realtime: bool,
}

#[derive(Debug, Args)]
struct HostArgs {
    #[command(flatten)]
    game: MatchArgs,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Player name announced to the peer
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct JoinArgs {
    #[command(flatten)]
    game: MatchArgs,

    /// Host address, e.g. 127.0.0.1:7878
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Player name announced to the peer
    #[arg(short, long)]
    name: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.mode {
        Mode::Local(args) => run_local(&args),
        Mode::Host(args) => run_host(&args),
        Mode::Join(args) => run_join(&args),
    }
}

fn run_local(args: &LocalArgs) -> Result<()> {
    let settings = args.game.settings()?;
    let mut rng = args.game.rng();
    let mut battle = Battle::new(settings, [rng.next_u32(), rng.next_u32()]);
    let mut seats = [
        HeuristicOpponent::new(rng.next_u32()),
        HeuristicOpponent::new(rng.next_u32()),
    ];

    let tick = Duration::from_millis(TICK_MS as u64);
    let started = Instant::now();
    battle.start_at(started);

    let mut clock = started;
    for _ in 0..args.ticks {
        for player in PlayerId::BOTH {
            seats[player.index()].step(TICK_MS, &mut battle, player);
        }
        battle.tick(TICK_MS);

        clock += tick;
        if args.realtime {
            if let Some(wait) = clock.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
        if battle.update_at(clock).is_decided() || !battle.is_running() {
            break;
        }
    }

    if battle.is_running() {
        battle.stop();
    }
    let [one, two] = PlayerId::BOTH.map(|p| battle.engine(p).score());
    info!(winner = ?battle.winner(), one, two, "local match over");
    Ok(())
}

fn run_host(args: &HostArgs) -> Result<()> {
    let settings = args.game.settings()?;
    let mut config = SessionConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(name) = &args.name {
        config.player_name = name.clone();
    }

    let mut rng = args.game.rng();
    let attacks = AttackQueue::new();
    let mut link = NetLink::host(&config, attacks.clone(), None)?;
    info!(peer = link.peer_name(), "peer joined");

    announce_match(&mut link, &settings, rng.next_u32());
    await_ready(&mut link)?;

    let duel = RemoteDuel::new(Role::Host, &settings, rng.next_u32(), attacks, link);
    play_remote(duel, rng.next_u32())
}

fn run_join(args: &JoinArgs) -> Result<()> {
    let local = args.game.settings()?;
    let mut config = SessionConfig::from_env();
    if let Some(addr) = args.addr {
        config.host = addr.ip().to_string();
        config.port = addr.port();
    }
    if let Some(name) = &args.name {
        config.player_name = name.clone();
    }

    let attacks = AttackQueue::new();
    let mut link = NetLink::connect(&config, attacks.clone())?;
    let (settings, seed) = await_match(&mut link, &local)?;
    info!(mode = ?settings.game_mode, seed, "match announced");

    let duel = RemoteDuel::new(Role::Client, &settings, seed, attacks, link);
    play_remote(duel, args.game.rng().next_u32())
}

/// Drive a networked duel in real time with the heuristic opponent at the keys
fn play_remote<L: PeerLink>(mut duel: RemoteDuel<L>, ai_seed: u32) -> Result<()> {
    let tick = Duration::from_millis(TICK_MS as u64);
    let mut seat = HeuristicOpponent::new(ai_seed);
    duel.start();

    let mut next = Instant::now();
    while duel.is_running() {
        if seat.poll(TICK_MS) {
            if let Some(action) = seat.decide(duel.engine()) {
                duel.apply_input(action);
            }
        }
        duel.tick(TICK_MS);

        next += tick;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    let remote = duel.remote_snapshot().map_or(0, |s| s.score);
    let result = match duel.winner() {
        Winner::Player(PlayerId::One) => "win",
        Winner::Player(PlayerId::Two) => "lose",
        Winner::Draw => "draw",
        Winner::None => "aborted",
    };
    info!(result, score = duel.engine().score(), remote, rtt = ?duel.last_rtt(), "network match over");

    // Let the result and goodbye reach the peer before the runtime goes away.
    duel.close();
    thread::sleep(Duration::from_millis(100));
    Ok(())
}
