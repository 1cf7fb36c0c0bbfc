//! Interactive line-oriented driver.
//!
//! Plugins only live as long as the process, so loading them and running
//! their commands happens here rather than through one-shot subcommands.

use std::io::{BufRead, Write};

use anyhow::{Result, bail};
use quill_core::{KeyChord, SessionStore};
use quill_plugin::builtin::BUILTINS;

use crate::workbench::Workbench;

const HELP: &str = "\
commands:
  tabs                      list tabs (* marks the active one)
  add                       open a new tab
  close <name>              close a tab
  select <name>             switch to a tab
  show                      print the active buffer
  type <text>               append text to the active buffer
  replace <pattern> <with>  regex replace-all in the active buffer
  run <chord> [args..]      run a surface command, e.g. `run ctrl+h var let`
  plugin list               list active plugins
  plugin load <name>        activate a plugin
  plugin unload <name>      deactivate a plugin
  quota                     show remaining quota
  help                      show this text
  quit                      leave the shell";

/// Outcome of one shell line.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

/// Runs the shell until `quit` or end of input.
pub fn run<S: SessionStore>(
    workbench: &mut Workbench<S>,
    input: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    writeln!(out, "quill shell, `help` for commands")?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        match execute(workbench, line.trim(), &mut out) {
            Ok(Step::Quit) => break,
            Ok(Step::Continue) => {}
            Err(e) => writeln!(out, "error: {e:#}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }

    workbench.shutdown()
}

/// Executes one command line.
pub fn execute<S: SessionStore>(
    workbench: &mut Workbench<S>,
    line: &str,
    out: &mut impl Write,
) -> Result<Step> {
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    match cmd {
        "" => {}
        "help" => writeln!(out, "{HELP}")?,
        "quit" | "exit" => return Ok(Step::Quit),
        "tabs" => print_tabs(workbench, out)?,
        "add" => {
            let tab = workbench.add_tab()?;
            writeln!(out, "opened {}", tab.name)?;
        }
        "close" => {
            let name = one_arg(&args, "close <name>")?;
            if !workbench.close_tab(name)? {
                writeln!(out, "no tab named {name}")?;
            }
        }
        "select" => workbench.select_tab(one_arg(&args, "select <name>")?)?,
        "show" => match workbench.session().active_content() {
            Some(text) => write!(out, "{text}")?,
            None => writeln!(out, "(no tab open)")?,
        },
        "type" => workbench.type_text(&unescape(rest))?,
        "replace" => {
            let [pattern, replacement] = args.as_slice() else {
                bail!("usage: replace <pattern> <with>");
            };
            if !workbench.replace_all(pattern, replacement)? {
                writeln!(out, "nothing to replace")?;
            }
        }
        "run" => {
            let Some((chord, rest)) = args.split_first() else {
                bail!("usage: run <chord> [args..]");
            };
            let chord: KeyChord = chord.parse().map_err(anyhow::Error::msg)?;
            let rest: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
            if !workbench.run_command(&chord, &rest)? {
                writeln!(out, "nothing bound to {chord}")?;
            }
        }
        "plugin" => plugin(workbench, &args, out)?,
        "quota" => {
            let session = workbench.session();
            writeln!(out, "{} tokens remaining", session.remaining_quota())?;
            if session.is_read_only() {
                writeln!(out, "quota exhausted, editing is disabled")?;
            }
        }
        other => bail!("unknown command `{other}`, try `help`"),
    }

    Ok(Step::Continue)
}

fn plugin<S: SessionStore>(
    workbench: &mut Workbench<S>,
    args: &[&str],
    out: &mut impl Write,
) -> Result<()> {
    match args {
        ["list"] | [] => {
            let active = workbench.active_plugins();
            if active.is_empty() {
                writeln!(out, "no plugins active (available: {})", BUILTINS.join(", "))?;
            }
            for name in active {
                writeln!(out, "{name}")?;
            }
        }
        ["load", name] => {
            if !workbench.load_plugin(name)? {
                writeln!(out, "{name} is already loaded")?;
            }
        }
        ["unload", name] => {
            if !workbench.unload_plugin(name)? {
                writeln!(out, "{name} is not loaded")?;
            }
        }
        _ => bail!("usage: plugin list | load <name> | unload <name>"),
    }
    Ok(())
}

pub fn print_tabs<S: SessionStore>(workbench: &Workbench<S>, out: &mut impl Write) -> Result<()> {
    let session = workbench.session();
    let active = session.active_tab().map(|t| t.name.as_str());
    for tab in session.tabs() {
        let marker = if Some(tab.name.as_str()) == active { '*' } else { ' ' };
        writeln!(
            out,
            "{marker} {:<16} {:>6} chars  {:>4} tokens",
            tab.name,
            tab.content.chars().count(),
            session.charged(&tab.name)
        )?;
    }
    Ok(())
}

fn one_arg<'a>(args: &[&'a str], usage: &str) -> Result<&'a str> {
    match args {
        [name] => Ok(*name),
        _ => bail!("usage: {usage}"),
    }
}

/// Turns `\n` and `\t` escapes into the characters they name.
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}
