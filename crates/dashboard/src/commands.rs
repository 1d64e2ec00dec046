//! Interactive commands read from stdin

use nerkh_core::SortKey;

use crate::alerts::{AlertDirection, AlertRequest};

pub const HELP: &str = "\
commands:
  r                               refresh now (bypasses cache)
  v                               toggle grid/list view
  s <name|symbol|price|change|source|updated>   sort, repeat to flip direction
  a <asset> <threshold> [above|below]           add a price alert
  d <alert-id-prefix>             delete an alert
  h                               help
  q                               quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    ToggleView,
    Sort(SortKey),
    AddAlert(AlertRequest),
    DeleteAlert(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = parts.collect();

        match (head.to_lowercase().as_str(), args.as_slice()) {
            ("r" | "refresh", []) => Ok(Command::Refresh),
            ("v" | "view", []) => Ok(Command::ToggleView),
            ("s" | "sort", [key]) => key.parse().map(Command::Sort),
            ("a" | "alert", [asset, threshold]) => Ok(Command::AddAlert(AlertRequest::new(
                *asset,
                *threshold,
                AlertDirection::default(),
            ))),
            ("a" | "alert", [asset, threshold, direction]) => Ok(Command::AddAlert(
                AlertRequest::new(*asset, *threshold, direction.parse()?),
            )),
            ("d" | "delete", [prefix]) => Ok(Command::DeleteAlert(prefix.to_string())),
            ("h" | "help" | "?", []) => Ok(Command::Help),
            ("q" | "quit" | "exit", []) => Ok(Command::Quit),
            (other, _) => Err(format!("unrecognized command: {other} (h for help)")),
        }
    }
}
