//! Interactive operator console.
//!
//! ```text
//! 1  manual      type raw command lines, `q` returns to the menu
//! 2  one-shot    a single pick cycle
//! 3  continuous  cycle until Ctrl-C
//! R  reference   re-capture the empty-tray reference
//! Q  quit
//! ```

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::orchestrator::{CycleOutcome, Orchestrator};

/// Top-level menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Manual,
    OneShot,
    Continuous,
    Recapture,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "manual" => Some(MenuChoice::Manual),
            "2" | "once" | "one-shot" => Some(MenuChoice::OneShot),
            "3" | "continuous" => Some(MenuChoice::Continuous),
            "r" | "reference" => Some(MenuChoice::Recapture),
            "q" | "quit" | "exit" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

/// What manual mode should do with one typed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualInput<'a> {
    Leave,
    Skip,
    Send(&'a str),
}

impl<'a> ManualInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            ManualInput::Skip
        } else if line.eq_ignore_ascii_case("q") {
            ManualInput::Leave
        } else {
            ManualInput::Send(line)
        }
    }
}

/// Result of handing one manual line to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualDelivery {
    Sent,
    /// The send failed and the link was re-opened; the line was not resent.
    Reconnected(String),
    /// The send failed and the link could not be re-opened.
    LinkDown(String),
}

/// Send `line`, with a single reconnect attempt if the link rejects it.
pub fn deliver(orchestrator: &mut Orchestrator, line: &str) -> ManualDelivery {
    let Err(e) = orchestrator.send_manual(line) else {
        return ManualDelivery::Sent;
    };
    warn!("Command not delivered: {e}");
    match orchestrator.reconnect() {
        Ok(()) => ManualDelivery::Reconnected(e.to_string()),
        Err(reconnect) => ManualDelivery::LinkDown(reconnect.to_string()),
    }
}

pub struct Console {
    editor: DefaultEditor,
    cancel: CancelFlag,
}

impl Console {
    /// `cancel` should be the flag wired to Ctrl-C.
    pub fn new(cancel: CancelFlag) -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            cancel,
        })
    }

    /// Block until the operator presses Enter. Returns `false` on Ctrl-C or
    /// end of input.
    pub fn wait_for_enter(&mut self, message: &str) -> bool {
        println!("{message}");
        self.editor.readline("Press Enter to continue... ").is_ok()
    }

    /// Show the menu until the operator quits.
    pub fn run_menu(&mut self, orchestrator: &mut Orchestrator) -> Result<(), ReadlineError> {
        loop {
            println!();
            println!("  1) Manual commands");
            println!("  2) One-shot pick");
            println!("  3) Continuous sorting (Ctrl-C to stop)");
            println!("  R) Re-capture empty-tray reference");
            println!("  Q) Quit");

            let line = match self.editor.readline("sorter> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
                Err(e) => return Err(e),
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::Manual) => self.run_manual(orchestrator)?,
                Some(MenuChoice::OneShot) => report(&orchestrator.run_one_shot()),
                Some(MenuChoice::Continuous) => self.run_continuous(orchestrator),
                Some(MenuChoice::Recapture) => {
                    if self.wait_for_enter("Clear the tray.") {
                        if let Err(e) = orchestrator.session_mut().recapture_reference() {
                            warn!("Reference not updated: {e}");
                        }
                    }
                }
                Some(MenuChoice::Quit) => return Ok(()),
                None => println!("Unknown choice {:?}", line.trim()),
            }
        }
    }

    /// Forward typed lines to the controller until `q`.
    pub fn run_manual(&mut self, orchestrator: &mut Orchestrator) -> Result<(), ReadlineError> {
        println!("Manual mode. Type commands such as `X F 1.00` or `C O`; `q` to leave.");
        loop {
            let line = match self.editor.readline("cmd> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
                Err(e) => return Err(e),
            };
            match ManualInput::parse(&line) {
                ManualInput::Leave => return Ok(()),
                ManualInput::Skip => continue,
                ManualInput::Send(command) => {
                    let _ = self.editor.add_history_entry(command);
                    match deliver(orchestrator, command) {
                        ManualDelivery::Sent => {}
                        ManualDelivery::Reconnected(e) => {
                            println!("Not delivered ({e}). Link re-opened, send it again.")
                        }
                        ManualDelivery::LinkDown(e) => {
                            println!("Link is down ({e}). Back to the menu.");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    pub fn run_continuous(&mut self, orchestrator: &mut Orchestrator) {
        self.cancel.reset();
        let summary = orchestrator.run_continuous(&self.cancel);
        self.cancel.reset();
        println!(
            "{} cycles: {} picked, {} empty, {} camera failures, {} link failures",
            summary.cycles,
            summary.completed,
            summary.no_detection,
            summary.device_failures,
            summary.communication_failures
        );
    }
}

/// Print a one-line account of a cycle.
pub fn report(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Completed { target, plan } => info!(
            "Picked object at {target}: X {:.2}s, Y {:.2}s",
            plan.x_seconds, plan.y_seconds
        ),
        CycleOutcome::NoDetection => info!("No object on the tray"),
        CycleOutcome::DeviceUnavailable { message } => warn!("Camera unavailable: {message}"),
        CycleOutcome::DetectionFailed { message } => warn!("Detection failed: {message}"),
        CycleOutcome::CommunicationFailure {
            step,
            reconnected,
            message,
        } => warn!("Link failed during {step} ({message}), reconnected: {reconnected}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SorterConfig;
    use crate::session::Session;
    use hardware::{RecordingConnector, ScriptedCamera};
    use vision::{Frame, ImageSize};

    fn orchestrator(link: &RecordingConnector) -> Orchestrator {
        let mut config = SorterConfig::default();
        config.link.reset_delay_s = 0.0;
        config.link.settle_s = 0.0;
        config.link.reconnect_backoff_s = 0.0;
        let camera =
            ScriptedCamera::new().then_frame(Frame::filled(ImageSize::from_width_height(640, 480), [90; 3]));
        let session = Session::start(config, Box::new(camera), Box::new(link.clone()), || true).unwrap();
        Orchestrator::new(session)
    }

    #[test]
    fn menu_choices() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Manual));
        assert_eq!(MenuChoice::parse(" 2 "), Some(MenuChoice::OneShot));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::Continuous));
        assert_eq!(MenuChoice::parse("R"), Some(MenuChoice::Recapture));
        assert_eq!(MenuChoice::parse("q"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("Q"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("4"), None);
    }

    #[test]
    fn manual_lines() {
        assert_eq!(ManualInput::parse("q"), ManualInput::Leave);
        assert_eq!(ManualInput::parse(" Q\n"), ManualInput::Leave);
        assert_eq!(ManualInput::parse("   "), ManualInput::Skip);
        assert_eq!(ManualInput::parse(" X F 1.00 "), ManualInput::Send("X F 1.00"));
        // Anything else goes to the controller, recognised or not
        assert_eq!(ManualInput::parse("quit"), ManualInput::Send("quit"));
    }

    #[test]
    fn delivered_line_reaches_the_link() {
        let link = RecordingConnector::new();
        let mut orchestrator = orchestrator(&link);
        assert_eq!(deliver(&mut orchestrator, "C O"), ManualDelivery::Sent);
        assert_eq!(link.lines(), vec!["C O"]);
    }

    #[test]
    fn rejected_line_reconnects_once() {
        let link = RecordingConnector::new().fail_write(0);
        let mut orchestrator = orchestrator(&link);

        let delivery = deliver(&mut orchestrator, "Z U 1.00");
        assert!(matches!(delivery, ManualDelivery::Reconnected(_)));
        assert_eq!(link.open_count(), 2);
        assert!(link.is_open());
        assert!(link.lines().is_empty());
    }

    #[test]
    fn failed_reconnect_reports_link_down() {
        let link = RecordingConnector::new().fail_write(0);
        let mut orchestrator = orchestrator(&link);
        link.fail_next_opens(1);

        let delivery = deliver(&mut orchestrator, "Z U 1.00");
        assert!(matches!(delivery, ManualDelivery::LinkDown(_)));
        assert!(!link.is_open());
    }
}
