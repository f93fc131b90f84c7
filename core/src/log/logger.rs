use super::LogError;
use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env};

/// Per-target levels plus a root level, parsed from `RUST_LOG`-like expressions such as
/// `info,collider_txscript=trace`.
#[derive(Debug, Default)]
pub(super) struct Loggers {
    targets: BTreeMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Loggers {
    pub fn new(root_level: LevelFilter) -> Self {
        Self { targets: BTreeMap::new(), root_level: Some(root_level) }
    }

    pub fn root_level(&self) -> LevelFilter {
        self.root_level.unwrap_or(LevelFilter::Error)
    }

    pub fn target_level(&self, target: &str) -> Option<LevelFilter> {
        self.targets.get(target).copied()
    }

    pub fn items(&self, appenders: &[&'static str]) -> Vec<Logger> {
        self.targets
            .iter()
            .map(|(name, level)| Logger::builder().appenders(appenders.iter().map(|x| x.to_string())).additive(false).build(name.clone(), *level))
            .collect()
    }

    pub fn parse_env(&mut self, var: &str) -> &mut Self {
        self.parse_expression(&env::var(var).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(str::trim).filter(|spec| !spec.is_empty()) {
            match parse_spec(spec) {
                Ok((Some(target), level)) => {
                    self.targets.insert(target.to_string(), level);
                }
                Ok((None, level)) => {
                    self.root_level = Some(level);
                }
                Err(err) => eprintln!("Ignoring invalid logging spec '{err}'"),
            }
        }
        self
    }
}

/// Parses `level`, `target` or `target=level`. A bare word that is not a level names a target
/// logging at every level.
fn parse_spec(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
    let mut parts = spec.split('=').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(single), None, None) => match single.parse() {
            Ok(level) => Ok((None, level)),
            Err(_) => Ok((Some(single), LevelFilter::max())),
        },
        (Some(target), Some(""), None) => Ok((Some(target), LevelFilter::max())),
        (Some(target), Some(level), None) => match level.parse() {
            Ok(level) => Ok((Some(target), level)),
            Err(_) => Err(LogError::ParseLoggerSpecError(level.to_string())),
        },
        _ => Err(LogError::ParseLoggerSpecError(spec.to_string())),
    }
}
