use {
    anyhow::Result,
    std::{
        fs::{File, OpenOptions},
        io::Write,
        path::PathBuf,
        sync::Mutex,
        time::{SystemTime, UNIX_EPOCH},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, file: &str, line: usize, message: &str);
}

pub static LOGGER: Mutex<Option<Box<dyn Logger>>> = Mutex::new(None);

/// Seconds since the unix epoch with millisecond precision.
pub fn format_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", now.as_secs(), now.subsec_millis())
}

pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, level: Level, file: &str, line: usize, message: &str) {
        println!(
            "[{}:{} - {}:{}] {}",
            level,
            format_timestamp(),
            file,
            line,
            message
        );
    }
}

pub fn init_stdout_logger() {
    LOGGER.lock().unwrap().replace(Box::new(StdoutLogger));
}

pub struct FileLogger {
    file: Mutex<File>,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.into())?;
        Ok(FileLogger {
            file: Mutex::new(file),
        })
    }
}

impl Logger for FileLogger {
    fn log(&self, level: Level, file: &str, line: usize, message: &str) {
        let log_line = format!(
            "[{}:{} - {}:{}] {}\n",
            level,
            format_timestamp(),
            file,
            line,
            message
        );
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(error) = file.write_all(log_line.as_bytes()) {
            eprintln!("Failed to write to log file: {}", error);
            eprintln!("{}", log_line.trim_end());
        }
    }
}

pub fn init_file_logger(path: impl Into<PathBuf>) -> Result<()> {
    LOGGER
        .lock()
        .unwrap()
        .replace(Box::new(FileLogger::new(path)?));
    Ok(())
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Debug, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Info, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Warn, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Error, file!(), line!() as usize, &message); } }};
}
