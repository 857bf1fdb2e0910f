// Service manager trigger run once a result has been persisted

use log::info;
use std::process::Command;

use crate::calibration::CalibrationResult;
use crate::error::PersistError;
use crate::persistence::device::DEFAULT_SELECTOR;

/// Opaque side effect invoked after a successful calibration
pub trait ServiceTrigger {
    fn trigger(&self, result: &CalibrationResult) -> Result<(), PersistError>;
}

/// Skips the service step (simulation, bypass runs without a service)
pub struct NoService;

impl ServiceTrigger for NoService {
    fn trigger(&self, result: &CalibrationResult) -> Result<(), PersistError> {
        info!("[Service] Skipping service trigger for {}", result);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAction {
    /// Disable the one-shot calibration unit
    Disable { unit: String },
    /// Enable and start `<template>@<C>_<M>_<B>`
    EnableInstance { template: String },
}

/// Runs `systemctl` for the configured action
pub struct Systemctl {
    action: ServiceAction,
    program: String,
}

impl Systemctl {
    pub fn new(action: ServiceAction) -> Self {
        Self {
            action,
            program: "systemctl".to_string(),
        }
    }

    /// Use another executable in place of `systemctl`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to `systemctl` for `result`
    pub fn args(&self, result: &CalibrationResult) -> Vec<String> {
        match &self.action {
            ServiceAction::Disable { unit } => vec!["disable".to_string(), unit.clone()],
            ServiceAction::EnableInstance { template } => vec![
                "enable".to_string(),
                "--now".to_string(),
                format!(
                    "{}@{}_{}_{}",
                    template,
                    result.selector.unwrap_or(DEFAULT_SELECTOR),
                    result.m,
                    result.b
                ),
            ],
        }
    }
}

impl ServiceTrigger for Systemctl {
    fn trigger(&self, result: &CalibrationResult) -> Result<(), PersistError> {
        let args = self.args(result);
        let command = format!("{} {}", self.program, args.join(" "));
        info!("[Service] Running `{}`", command);

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| PersistError::Service {
                command: command.clone(),
                details: err.to_string(),
            })?;

        if !status.success() {
            return Err(PersistError::Service {
                command,
                details: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}
