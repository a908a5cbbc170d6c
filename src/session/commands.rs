use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::catalog::SessionId;

pub const HELP: &str = "\
commands:
  list              show the meditations
  open <id>         open a meditation
  toggle            start or stop (aliases: start, stop)
  adjust            adjust the duration
  set <secs>        on the duration screen: set seconds remaining
  pick <n>          on the duration screen: choose a preset
  back              go back
  show              redraw the current screen
  quit              exit";

/// One line of terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenCommand {
    List,
    Open(SessionId),
    Toggle,
    Adjust,
    Set(u32),
    Pick(usize),
    Back,
    Show,
    Help,
    Quit,
}

impl FromStr for ScreenCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = words.next();
        if words.next().is_some() {
            bail!("too many arguments for `{verb}`");
        }

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("list" | "ls", None) => ScreenCommand::List,
            ("open", Some(id)) => ScreenCommand::Open(id.parse()?),
            ("toggle" | "start" | "stop", None) => ScreenCommand::Toggle,
            ("adjust", None) => ScreenCommand::Adjust,
            ("set", Some(secs)) => ScreenCommand::Set(
                secs.parse()
                    .with_context(|| format!("`{secs}` is not a number of seconds"))?,
            ),
            ("pick", Some(n)) => ScreenCommand::Pick(
                n.parse()
                    .with_context(|| format!("`{n}` is not a preset number"))?,
            ),
            ("back", None) => ScreenCommand::Back,
            ("show", None) => ScreenCommand::Show,
            ("help" | "?", None) => ScreenCommand::Help,
            ("quit" | "exit" | "q", None) => ScreenCommand::Quit,
            (other, _) => bail!("unknown command `{other}`, try `help`"),
        };
        Ok(command)
    }
}
