//! All Paths are recorded here for use throughout this codebase
pub mod base {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const ABOUT: &str = "/about";
    pub const PING: &str = "/ping";
}

pub mod room {
    pub const JOIN: &str = "/join";
    pub const LEAVE: &str = "/leave";
    pub const SEND: &str = "/send";
    pub const MESSAGES: &str = "/messages";
}

pub const LOGS: &str = "/logs";

pub fn messages_path(client_id: &str) -> String {
    format!("{}?id={}", room::MESSAGES, client_id)
}
