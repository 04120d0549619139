use thiserror::Error;

/// Main error type for the notifier
#[derive(Error, Debug)]
pub enum NotifierError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Отсутствуют переменные окружения: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("Invalid {0} value: {1}")]
    InvalidCredential(&'static str, String),

    // Network errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Сбой при запросе к эндпоинту: {0}")]
    ApiResponse(String),

    // Serialization errors
    #[error("Некорректный JSON в ответе API: {0}")]
    Json(#[from] serde_json::Error),

    // Response shape errors
    #[error("{0}")]
    CheckResponse(String),

    #[error("Ошибка доступа по ключу '{0}'")]
    MissingField(&'static str),

    #[error("Неизвестный статус домашней работы: {0}")]
    UnknownStatus(String),

    // Outbound notification errors
    #[error("Сообщение не отправилось: {0}")]
    Notification(String),
}

/// Result type alias for NotifierError
pub type Result<T> = std::result::Result<T, NotifierError>;
