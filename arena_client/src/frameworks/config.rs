use std::{env, path::PathBuf, time::Duration};

// Runtime/client constants (not match tuning).

pub fn server_url() -> String {
    env::var("ARENA_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:9000/websocket".to_string())
}

pub fn connect_timeout() -> Duration {
    env_millis("CONNECT_TIMEOUT_MS", 5000)
}

// 0 disables flash coalescing.
pub fn flash_coalesce_window() -> Duration {
    env_millis("FLASH_COALESCE_MS", 0)
}

pub fn flash_duration() -> Duration {
    env_millis("FLASH_DURATION_MS", 200)
}

pub fn player_code_path() -> Option<PathBuf> {
    env::var_os("PLAYER_CODE_PATH").map(PathBuf::from)
}

pub fn player_class_name() -> Option<String> {
    env::var("PLAYER_CLASS_NAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
}

fn env_millis(name: &str, default: u64) -> Duration {
    let millis = env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}

pub const INBOUND_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
pub const INITIAL_AGENT_HEALTH: u32 = 100;

pub const RENDER_INTERVAL: Duration = Duration::from_millis(1000 / 60);
