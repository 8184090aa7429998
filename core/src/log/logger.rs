use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::HashMap, env, mem};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("logger spec parsing error: {0}")]
    ParseLoggerSpec(String),

    #[error("logger config error: {0}")]
    Config(String),

    #[error("logger init error: {0}")]
    Init(String),
}

pub(super) struct Loggers {
    loggers: Vec<(String, LevelFilter)>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    /// Per-module loggers. They inherit the root appenders.
    pub fn items(&self) -> impl IntoIterator<Item = Logger> + '_ {
        self.loggers.iter().map(|(name, level)| Logger::builder().build(name.clone(), *level))
    }

    #[cfg(test)]
    pub fn level_of(&self, name: &str) -> Option<LevelFilter> {
        self.loggers.iter().find(|(n, _)| n == name).map(|(_, l)| *l)
    }
}

pub(super) struct Builder {
    loggers: HashMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { loggers: HashMap::new(), root_level: None }
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match Self::parse_spec(spec) {
                Ok((None, level)) => {
                    self.root_level.replace(level);
                }
                Ok((Some(name), level)) => {
                    self.loggers.insert(name.to_string(), level);
                }
                Err(err) => eprintln!("Ignoring invalid logging spec: {}", err),
            }
        }
        self
    }

    fn parse_spec(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
        let mut parts = spec.split('=').map(|x| x.trim());
        match (parts.next(), parts.next(), parts.next()) {
            // A single level sets the root, a single name enables everything for that module
            (Some(part0), None, None) => match part0.parse() {
                Ok(level) => Ok((None, level)),
                Err(_) => Ok((Some(part0), LevelFilter::max())),
            },
            (Some(part0), Some(""), None) => Ok((Some(part0), LevelFilter::max())),
            (Some(part0), Some(part1), None) => {
                part1.parse().map(|level| (Some(part0), level)).map_err(|_| LogError::ParseLoggerSpec(part1.to_string()))
            }
            _ => Err(LogError::ParseLoggerSpec(spec.to_string())),
        }
    }

    pub fn build(&mut self) -> Loggers {
        let loggers = mem::take(&mut self.loggers).into_iter().collect();
        Loggers { loggers, root_level: self.root_level.take().unwrap_or(LevelFilter::Info) }
    }
}
