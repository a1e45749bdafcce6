use std::net::SocketAddr;

use clap::Parser;

/// Runtime configuration, sourced from CLI flags or the environment.
#[derive(Clone, Debug, Parser)]
#[command(name = "plo-server", about = "Multi-table Pot-Limit Omaha server")]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[arg(long, env = "PLO_BIND", default_value = "0.0.0.0:4000")]
    pub bind: SocketAddr,

    /// Allowed client origin for CORS; `*` allows any.
    #[arg(long, env = "PLO_CLIENT_ORIGIN", default_value = "*")]
    pub client_origin: String,

    /// WebSocket ping interval in milliseconds.
    #[arg(long, env = "PLO_PING_INTERVAL_MS", default_value_t = 25_000)]
    pub ping_interval_ms: u64,

    /// WebSocket ping timeout in milliseconds.
    #[arg(long, env = "PLO_PING_TIMEOUT_MS", default_value_t = 20_000)]
    pub ping_timeout_ms: u64,

    /// Connection URL for the transactional store. Ignored unless
    /// `--persistence-enabled` is set; the in-process store is used otherwise.
    #[arg(long, env = "PLO_STORE_URL")]
    pub store_url: Option<String>,

    /// Whether to write hands and stats to the external store.
    #[arg(long, env = "PLO_PERSISTENCE_ENABLED", default_value_t = false)]
    pub persistence_enabled: bool,

    /// Default blinds for matchmaking, as "sb/bb".
    #[arg(long, env = "PLO_DEFAULT_BLINDS", default_value = "1/3")]
    pub default_blinds: String,

    /// Rake taken from each pot, as a fraction.
    #[arg(long, env = "PLO_RAKE_PERCENT", default_value_t = 0.05)]
    pub rake_percent: f64,

    /// Rake cap expressed in big blinds.
    #[arg(long, env = "PLO_RAKE_CAP_BB", default_value_t = 1)]
    pub rake_cap_bb: u64,

    /// Per-decision action timeout in milliseconds.
    #[arg(long, env = "PLO_ACTION_TIMEOUT_MS", default_value_t = 25_000)]
    pub action_timeout_ms: u64,

    /// Pause between a street-closing action and the board reveal.
    #[arg(long, env = "PLO_STREET_TRANSITION_MS", default_value_t = 1_200)]
    pub street_transition_ms: u64,

    /// Pause after an applied action before the next prompt.
    #[arg(long, env = "PLO_ACTION_ANIMATION_MS", default_value_t = 400)]
    pub action_animation_ms: u64,

    /// How long results stay on screen before the table goes idle.
    #[arg(long, env = "PLO_RESULT_DISPLAY_MS", default_value_t = 5_000)]
    pub result_display_ms: u64,

    /// Delay between a hand completing and the next hand starting.
    #[arg(long, env = "PLO_POST_HAND_MS", default_value_t = 1_500)]
    pub post_hand_ms: u64,

    /// Grace period before a disconnected seat is cashed out. The current
    /// policy is immediate; the knob exists for deployments that want one.
    #[arg(long, env = "PLO_DISCONNECT_GRACE_MS", default_value_t = 0)]
    pub disconnect_grace_ms: u64,

    /// Start with the maintenance switch on: no new hands, no new seating.
    #[arg(long, env = "PLO_MAINTENANCE", default_value_t = false)]
    pub maintenance: bool,

    /// Starting bankroll granted to users the in-process store has not seen.
    #[arg(long, env = "PLO_STARTING_BANKROLL", default_value_t = 10_000)]
    pub starting_bankroll: u64,

    /// Buy-in, in big blinds, charged when matchmaking seats a player.
    #[arg(long, env = "PLO_BUY_IN_BB", default_value_t = 100)]
    pub buy_in_bb: u64,
}

impl ServerConfig {
    /// Parse an "sb/bb" blinds string into chip amounts.
    pub fn parse_blinds(blinds: &str) -> Option<(u64, u64)> {
        let (sb, bb) = blinds.split_once('/')?;
        let sb: u64 = sb.trim().parse().ok()?;
        let bb: u64 = bb.trim().parse().ok()?;
        if sb == 0 || bb < sb {
            return None;
        }
        Some((sb, bb))
    }
}
