use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("logger spec parsing error: {0}")]
    ParseLoggerSpecError(String),

    #[error("log directory {0} is not valid UTF-8")]
    InvalidLogDir(String),

    #[error("appender {0} could not be built: {1}")]
    AppenderError(&'static str, String),

    #[error("logger configuration error: {0}")]
    ConfigError(String),

    #[error("a global logger is already initialized")]
    AlreadyInitialized,
}

/// A single `target=level` directive of a filter expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Directive {
    pub target: Option<String>,
    pub level: LevelFilter,
}

impl FromStr for Directive {
    type Err = LogError;

    /// Accepts `level`, `target`, `target=` and `target=level`.
    /// A lone token parsing as a level sets the root level, otherwise it names a target enabled at max level.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut parts = spec.split('=').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(token), None, None) => match token.parse() {
                Ok(level) => Ok(Self { target: None, level }),
                Err(_) => Ok(Self { target: Some(token.to_string()), level: LevelFilter::max() }),
            },
            (Some(target), Some(""), None) => Ok(Self { target: Some(target.to_string()), level: LevelFilter::max() }),
            (Some(target), Some(level), None) => level
                .parse()
                .map(|level| Self { target: Some(target.to_string()), level })
                .map_err(|_| LogError::ParseLoggerSpecError(level.to_string())),
            _ => Err(LogError::ParseLoggerSpecError(spec.to_string())),
        }
    }
}

/// Resolved per-target loggers plus the root level
pub(super) struct Loggers {
    targets: BTreeMap<String, LevelFilter>,
    appenders: Vec<&'static str>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl Iterator<Item = Logger> + '_ {
        self.targets.iter().map(|(target, level)| {
            Logger::builder().appenders(self.appenders.iter().map(|x| x.to_string())).additive(false).build(target.clone(), *level)
        })
    }
}

#[derive(Default)]
pub(super) struct Builder {
    appenders: Vec<&'static str>,
    targets: BTreeMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    /// Applies a comma-separated list of directives. Later directives override earlier ones.
    /// Invalid directives are reported and skipped.
    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            match spec.parse::<Directive>() {
                Ok(Directive { target: Some(target), level }) => {
                    self.targets.insert(target, level);
                }
                Ok(Directive { target: None, level }) => {
                    self.root_level = Some(level);
                }
                Err(err) => eprintln!("Ignoring invalid logging spec '{}': {}", spec, err),
            }
        }
        self
    }

    pub fn appenders(&mut self, appenders: impl IntoIterator<Item = &'static str>) -> &mut Self {
        self.appenders = appenders.into_iter().collect();
        self
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level = Some(root_level);
        self
    }

    pub fn build(&mut self) -> Loggers {
        Loggers {
            targets: std::mem::take(&mut self.targets),
            appenders: std::mem::take(&mut self.appenders),
            root_level: self.root_level.take().unwrap_or(LevelFilter::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_parsing() {
        assert_eq!("debug".parse::<Directive>().unwrap(), Directive { target: None, level: LevelFilter::Debug });
        assert_eq!(
            "sopnet_blockwise=trace".parse::<Directive>().unwrap(),
            Directive { target: Some("sopnet_blockwise".to_string()), level: LevelFilter::Trace }
        );
        assert_eq!(
            "sopnet_database".parse::<Directive>().unwrap(),
            Directive { target: Some("sopnet_database".to_string()), level: LevelFilter::max() }
        );
        assert_eq!(
            "sopnet_database=".parse::<Directive>().unwrap(),
            Directive { target: Some("sopnet_database".to_string()), level: LevelFilter::max() }
        );
        assert!("a=b=c".parse::<Directive>().is_err());
        assert!("sopnet=loud".parse::<Directive>().is_err());
    }

    #[test]
    fn test_builder_expression() {
        let loggers = Builder::new().root_level(LevelFilter::Info).parse_expression("warn, sopnet_blockwise=debug,, bogus=x").build();
        assert_eq!(LevelFilter::Warn, loggers.root_level());
        assert_eq!(1, loggers.items().count());

        let loggers = Builder::new().build();
        assert_eq!(LevelFilter::Error, loggers.root_level());
    }
}
