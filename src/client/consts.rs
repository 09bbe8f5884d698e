pub const AVATAR_WS_URL: &str = "AVATAR_WS_URL";
pub const AVATAR_WS_TOKEN: &str = "AVATAR_WS_TOKEN";

pub const DEFAULT_URL: &str = "ws://localhost:3000";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
