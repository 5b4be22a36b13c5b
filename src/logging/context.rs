use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Single-shot commands driven from a terminal.
    LocalDev,
    /// Directory-wide batch runs that should be quiet on the console.
    Batch,
}

impl ExecutionContext {
    /// Returns `true` when console sinks are off unless explicitly configured.
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::Batch)
    }
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Batch(_) => ExecutionContext::Batch,
        Command::Submit(_)
        | Command::Validate(_)
        | Command::Check(_)
        | Command::Transform(_) => ExecutionContext::LocalDev,
    }
}
