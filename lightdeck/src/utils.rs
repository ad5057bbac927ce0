use crate::error::{Error, Result};
use colored::Colorize;
use std::future::Future;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Races `future` against the ambient cancellation token. A cancelled call
/// fails with `Error::Cancelled` and its result is discarded.
pub async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

pub fn print_field(out: &mut dyn Write, label: &str, value: &str) -> Result<()> {
    writeln!(out, "{:<17} {}", label, value)?;
    Ok(())
}

pub fn print_step(out: &mut dyn Write, step: &str, ok: bool) -> Result<()> {
    if ok {
        writeln!(out, "{}  ..... [  {}  ]", step, "OK".white().bold())?;
    } else {
        writeln!(out, "{}  ..... [ {} ]", step, "SKIP".yellow().bold())?;
    }
    Ok(())
}

/// Flattens an error and its sources into one line.
pub fn describe_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
