use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use game::{
    AnalysisApplied, AnalysisFailure, AnalysisResponse, CellCount, Coord, Coord2,
    CredentialPrompt, ImagePayload, LayoutGenerator, RevealOutcome, Session,
};
use mines_core as game;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::render;

pub const HELP: &str = "\
Commands:
  <cell> | reveal <cell>   reveal a cell, e.g. `b3`
  new [size] [mines]       start a new round
  restart                  new round with the same settings
  size <n>                 change the grid size (3, 5 and 7 are the usual ones)
  mines <n>                change the mine count
  analyze <image>          ask for safe-cell predictions from a screenshot
  debug                    toggle showing every cell
  settings | close         open or close the settings panel
  key                      select a new API key
  history                  list finished rounds
  board                    print the board again
  help                     show this help
  quit                     leave";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Reveal(Coord2),
    New {
        size: Option<Coord>,
        mines: Option<CellCount>,
    },
    Restart,
    Size(Coord),
    Mines(CellCount),
    Analyze(PathBuf),
    Debug,
    Settings,
    Close,
    Key,
    History,
    Board,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command `{0}`, type `help` for the list")]
    Unknown(String),
    #[error("Missing {0}")]
    Missing(&'static str),
    #[error("Invalid {what} `{value}`")]
    Invalid { what: &'static str, value: String },
}

fn parse_arg<T: FromStr>(value: &str, what: &'static str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::Invalid {
        what,
        value: value.to_string(),
    })
}

fn parse_cell(value: &str) -> Result<Coord2, CommandError> {
    game::parse_cell_label(value).ok_or_else(|| CommandError::Invalid {
        what: "cell",
        value: value.to_string(),
    })
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match head.to_ascii_lowercase().as_str() {
            "reveal" | "r" => {
                Self::Reveal(parse_cell(arg.ok_or(CommandError::Missing("cell"))?)?)
            }
            "new" | "n" => Self::New {
                size: arg.map(|value| parse_arg(value, "size")).transpose()?,
                mines: words
                    .next()
                    .map(|value| parse_arg(value, "mine count"))
                    .transpose()?,
            },
            "restart" => Self::Restart,
            "size" => Self::Size(parse_arg(arg.ok_or(CommandError::Missing("size"))?, "size")?),
            "mines" => Self::Mines(parse_arg(
                arg.ok_or(CommandError::Missing("mine count"))?,
                "mine count",
            )?),
            "analyze" | "a" => Self::Analyze(PathBuf::from(
                arg.ok_or(CommandError::Missing("image path"))?,
            )),
            "debug" => Self::Debug,
            "settings" => Self::Settings,
            "close" => Self::Close,
            "key" => Self::Key,
            "history" | "h" => Self::History,
            "board" | "b" => Self::Board,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => match game::parse_cell_label(other) {
                Some(coords) if arg.is_none() => Self::Reveal(coords),
                _ => return Err(CommandError::Unknown(head.to_string())),
            },
        };
        Ok(Some(command))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Reads a screenshot file. A file holding a `data:` URL is taken as is.
pub async fn load_image(path: &Path) -> anyhow::Result<ImagePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {}", path.display()))?;
    if bytes.starts_with(b"data:") {
        let url = String::from_utf8(bytes).context("data URL is not UTF-8")?;
        return Ok(ImagePayload::from_data_url(url.trim()));
    }
    Ok(ImagePayload::new(mime_for(path), STANDARD.encode(&bytes)))
}

/// Line-oriented front end around a [`Session`].
pub struct App<G, W> {
    session: Session<G>,
    out: W,
    analyzer_label: String,
    responses_tx: mpsc::UnboundedSender<AnalysisResponse>,
    responses_rx: mpsc::UnboundedReceiver<AnalysisResponse>,
}

impl<G: LayoutGenerator, W: Write> App<G, W> {
    pub fn new(session: Session<G>, out: W, analyzer_label: impl Into<String>) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            session,
            out,
            analyzer_label: analyzer_label.into(),
            responses_tx,
            responses_rx,
        }
    }

    /// Reads commands from stdin while applying analysis results as they arrive.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.show()?;

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("reading stdin")? else {
                        break;
                    };
                    match Command::parse(&line) {
                        Ok(Some(command)) => {
                            if self.handle(command).await? == Flow::Quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => writeln!(self.out, "{}", err)?,
                    }
                }
                Some(response) = self.responses_rx.recv() => {
                    writeln!(self.out)?;
                    self.on_response(response)?;
                }
            }
        }
        Ok(())
    }

    pub async fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        log::trace!("command {:?}", command);
        match command {
            Command::Reveal(coords) => self.reveal(coords)?,
            Command::New { size, mines } => {
                let config = self.session.config();
                self.session
                    .start_new_round(size.unwrap_or(config.size), mines.unwrap_or(config.mines));
                self.show()?;
            }
            Command::Restart => {
                self.session.restart();
                self.show()?;
            }
            Command::Size(size) => {
                self.session.change_grid_size(size);
                self.show()?;
            }
            Command::Mines(mines) => {
                self.session.change_mine_count(mines);
                self.show()?;
            }
            Command::Analyze(path) => self.analyze(&path).await?,
            Command::Debug => {
                let shown = self.session.toggle_debug_reveal();
                writeln!(self.out, "Debug reveal {}", if shown { "on" } else { "off" })?;
                self.show()?;
            }
            Command::Settings => {
                self.session.open_settings();
                self.show_settings()?;
            }
            Command::Close => {
                self.session.close_settings();
                writeln!(self.out, "Settings closed")?;
            }
            Command::Key => self.select_key().await?,
            Command::History => write!(self.out, "{}", render::history(&self.session))?,
            Command::Board => self.show()?,
            Command::Help => writeln!(self.out, "{}\n\n{}", HELP, render::LEGEND)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn reveal(&mut self, coords: Coord2) -> anyhow::Result<()> {
        match self.session.reveal_cell(coords) {
            Ok(RevealOutcome::NoChange) => {
                writeln!(
                    self.out,
                    "{} is already revealed or the round is over",
                    game::cell_label(coords)
                )?;
            }
            Ok(outcome) => {
                self.show()?;
                match outcome {
                    RevealOutcome::HitMine => {
                        writeln!(self.out, "Boom. Round lost, `new` to play again.")?
                    }
                    RevealOutcome::Won => writeln!(self.out, "Every gem found. Round won!")?,
                    _ => {}
                }
            }
            Err(err) => writeln!(self.out, "{}: {}", game::cell_label(coords), err)?,
        }
        Ok(())
    }

    async fn analyze(&mut self, path: &Path) -> anyhow::Result<()> {
        let image = match load_image(path).await {
            Ok(image) => image,
            Err(err) => {
                log::error!("{:#}", err);
                let failure = AnalysisFailure::Generic;
                self.session.fail_analysis(failure);
                writeln!(self.out, "{:#}\n{}", err, failure)?;
                return Ok(());
            }
        };

        let pending = self.session.request_analysis(image);
        writeln!(self.out, "Analyzing {}...", path.display())?;

        let responses = self.responses_tx.clone();
        tokio::spawn(async move {
            // the receiver lives as long as the app
            let _ = responses.send(pending.await);
        });
        Ok(())
    }

    /// Applies a finished analysis, stale ones are dropped silently.
    pub fn on_response(&mut self, response: AnalysisResponse) -> anyhow::Result<()> {
        match self.session.apply_analysis(response) {
            AnalysisApplied::Predictions(count) => {
                writeln!(self.out, "{} safe-cell predictions", count)?;
                self.show()?;
            }
            AnalysisApplied::Failed(failure) => {
                writeln!(self.out, "{}", failure)?;
                if self.session.settings_open() {
                    self.show_settings()?;
                }
            }
            AnalysisApplied::Discarded => {}
        }
        Ok(())
    }

    async fn select_key(&mut self) -> anyhow::Result<()> {
        match self.session.select_credentials() {
            CredentialPrompt::Picker(picker) => {
                picker.await;
                self.session.credentials_selected();
                writeln!(self.out, "API key updated")?;
            }
            CredentialPrompt::Unavailable(message) => writeln!(self.out, "{}", message)?,
        }
        Ok(())
    }

    fn show(&mut self) -> anyhow::Result<()> {
        write!(
            self.out,
            "{}{}",
            render::board(&self.session),
            render::status(&self.session)
        )?;
        Ok(())
    }

    fn show_settings(&mut self) -> anyhow::Result<()> {
        let config = self.session.config();
        writeln!(
            self.out,
            "Settings: {}x{} grid, {} mines, analysis via {}\n  {}",
            config.size,
            config.size,
            config.mines,
            self.analyzer_label,
            "`size <n>`, `mines <n>`, `key` to select an API key, `close` when done"
        )?;
        Ok(())
    }
}
