mod mysql;

pub use mysql::{ConnectOptions, MySqlClient};
