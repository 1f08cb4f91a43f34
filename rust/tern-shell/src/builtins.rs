//! Directives every shell understands.

use std::io::Write;
use std::str::FromStr;

use tern_core::SnippetId;

use crate::commands::{CommandFlow, CommandSpec};
use crate::engine::LineOutcome;
use crate::error::ShellError;
use crate::session::Session;
use crate::symbols::{SymbolKind, SymbolQuery};

type Outcome = Result<CommandFlow, ShellError>;

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("help", "List directives, or show one directive's usage", help)
            .alias("h")
            .usage(":help [directive]"),
        CommandSpec::new("quit", "Leave the shell", |_, _, _| Ok(CommandFlow::Quit)).alias("q"),
        CommandSpec::new("reset", "Forget all snippets, bindings and symbols", reset).alias("r"),
        CommandSpec::new("rollback", "Drop every snippet evaluated after a line", rollback)
            .usage(":rollback <line>"),
        CommandSpec::new("history", "Show evaluated snippets", history),
        CommandSpec::new("symbols", "List live symbols", symbols)
            .alias("s")
            .usage(":symbols [pattern] [--kind class|instance|function]"),
        CommandSpec::new("generations", "Show compiler and executor generations", generations)
            .alias("g"),
        CommandSpec::new("load", "Evaluate a file line by line", load)
            .alias("l")
            .usage(":load <file>"),
        CommandSpec::new("dump", "Print live symbols as JSON", dump),
    ]
}

fn help(session: &dyn Session, args: &[String], out: &mut dyn Write) -> Outcome {
    let infos = session.commands();
    if let Some(word) = args.first() {
        let word = word.trim_start_matches(':');
        let info = infos
            .iter()
            .find(|i| i.name == word || i.alias.as_deref() == Some(word))
            .ok_or_else(|| ShellError::InvalidUsage(format!("no directive ':{}'", word)))?;
        writeln!(out, "{}", info.usage)?;
        writeln!(out, "  {}", info.summary)?;
        return Ok(CommandFlow::Continue);
    }
    for info in &infos {
        let names = match &info.alias {
            Some(alias) => format!(":{}, :{}", info.name, alias),
            None => format!(":{}", info.name),
        };
        writeln!(out, "  {:<20} {}", names, info.summary)?;
    }
    Ok(CommandFlow::Continue)
}

fn reset(session: &dyn Session, _: &[String], out: &mut dyn Write) -> Outcome {
    session.reset();
    writeln!(out, "session reset")?;
    Ok(CommandFlow::Continue)
}

fn rollback(session: &dyn Session, args: &[String], out: &mut dyn Write) -> Outcome {
    let [line] = args else {
        return Err(ShellError::InvalidUsage("usage: :rollback <line>".into()));
    };
    let line: u64 = line
        .parse()
        .map_err(|_| ShellError::InvalidUsage(format!("'{}' is not a line number", line)))?;
    let dropped = session.rollback(SnippetId(line))?;
    writeln!(out, "rolled back to line {} ({} dropped)", line, dropped)?;
    Ok(CommandFlow::Continue)
}

fn history(session: &dyn Session, _: &[String], out: &mut dyn Write) -> Outcome {
    for record in session.history() {
        let mut lines = record.snippet.source.lines();
        let first = lines.next().unwrap_or("");
        writeln!(out, "{:>4} [{}] {}", record.snippet.id, record.status, first)?;
        for rest in lines {
            writeln!(out, "{:>4}  {}", "", rest)?;
        }
    }
    Ok(CommandFlow::Continue)
}

fn symbol_query(args: &[String]) -> Result<SymbolQuery, ShellError> {
    let mut query = SymbolQuery::new();
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg == "--kind" || arg == "-k" {
            let kind = args
                .next()
                .ok_or_else(|| ShellError::InvalidUsage("--kind needs a value".into()))?;
            let kind = SymbolKind::from_str(kind)
                .map_err(|_| ShellError::InvalidUsage(format!("unknown symbol kind '{}'", kind)))?;
            query = query.kind(kind);
        } else {
            query = query.pattern(arg)?;
        }
    }
    Ok(query)
}

fn symbols(session: &dyn Session, args: &[String], out: &mut dyn Write) -> Outcome {
    let query = symbol_query(args)?;
    for symbol in session.symbols(&query) {
        writeln!(
            out,
            "{:<40} {} (line {})",
            symbol.describe(),
            symbol.namespace,
            symbol.origin
        )?;
    }
    Ok(CommandFlow::Continue)
}

fn generations(session: &dyn Session, _: &[String], out: &mut dyn Write) -> Outcome {
    writeln!(out, "{}", session.generations())?;
    let pending = session.pending_lines();
    if !pending.is_empty() {
        writeln!(out, "{} line(s) pending", pending.len())?;
    }
    Ok(CommandFlow::Continue)
}

fn load(session: &dyn Session, args: &[String], out: &mut dyn Write) -> Outcome {
    let [path] = args else {
        return Err(ShellError::InvalidUsage("usage: :load <file>".into()));
    };
    let source = std::fs::read_to_string(path)?;
    let mut count = 0usize;
    for line in source.lines() {
        count += 1;
        if let LineOutcome::Command(CommandFlow::Quit) = session.submit_line(line)? {
            return Ok(CommandFlow::Quit);
        }
    }
    if !session.pending_lines().is_empty() {
        session.clear_buffer();
        return Err(ShellError::InvalidUsage(format!(
            "{} ends inside an incomplete snippet",
            path
        )));
    }
    writeln!(out, "loaded {} line(s) from {}", count, path)?;
    Ok(CommandFlow::Continue)
}

fn dump(session: &dyn Session, args: &[String], out: &mut dyn Write) -> Outcome {
    let symbols = session.symbols(&symbol_query(args)?);
    let json = serde_json::to_string_pretty(&symbols)
        .map_err(|e| ShellError::InvalidUsage(format!("cannot serialize symbols: {}", e)))?;
    writeln!(out, "{}", json)?;
    Ok(CommandFlow::Continue)
}
