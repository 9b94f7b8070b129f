//! Interactive comparison loop shared by `add` and `rerank`.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use ranklist_core::{Preference, RankingSession};

/// Drive a session to resolution by prompting for each comparison.
///
/// Accepted answers: `b`/`better`, `w`/`worse`, `u`/`?` (undecided, treated
/// as worse). Anything else re-prompts.
///
/// # Errors
///
/// Returns an error if input ends before the session resolves, or on I/O
/// failure.
pub fn resolve_interactively<R: BufRead, W: Write>(
    session: &mut RankingSession,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let candidate = session.item_id().clone();

    while let Some(probe) = session.probe() {
        write!(
            out,
            "Is '{candidate}' better or worse than '{}'? [b/w/u] ",
            probe.item_id
        )?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("Comparison input ended before the ranking resolved");
        }

        let preference = match line.trim().to_lowercase().as_str() {
            "b" | "better" => Preference::Better,
            "w" | "worse" => Preference::Worse,
            "u" | "?" | "undecided" => Preference::Undecided,
            other => {
                writeln!(out, "Unrecognized answer '{other}'; enter b, w, or u.")?;
                continue;
            }
        };
        session.decide(preference);
    }

    Ok(())
}
