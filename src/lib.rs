pub mod cli;
pub mod config;
pub mod error;
pub mod homework;
pub mod logging;
pub mod poller;
pub mod practicum;
pub mod telegram;

pub use config::{AppConfig, Credentials};
pub use error::{NotifierError, Result};
pub use homework::{check_response, parse_status, HomeworkStatus};
pub use poller::{StatusPoller, TickOutcome};
pub use practicum::{HomeworkApi, PracticumClient};
pub use telegram::{Notifier, TelegramNotifier};
