// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const ASSIGN: &str = "assign";
const CLEAR: &str = "clear";
const VOLUME: &str = "volume";
const STATE: &str = "state";
const QUIT: &str = "quit";

/// A controller that drives the mixer from lines typed on stdin.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses one line of input. Blank or malformed lines give None.
    fn parse(input: &str) -> Option<Event> {
        let words: Vec<&str> = input.split_whitespace().collect();
        let command = words.first()?.to_lowercase();
        match (command.as_str(), &words[1..]) {
            (ASSIGN, [slot, sample]) => Some(Event::Assign {
                slot: slot.to_string(),
                sample: sample.to_string(),
            }),
            (CLEAR, [slot]) => Some(Event::Clear {
                slot: slot.to_string(),
            }),
            (VOLUME, [slot, volume]) => volume.parse().ok().map(|volume| Event::Volume {
                slot: slot.to_string(),
                volume,
            }),
            (STATE, []) => Some(Event::State),
            (QUIT, []) => Some(Event::Quit),
            _ => None,
        }
    }

    /// Reads and dispatches one command. Returns false once input is exhausted or the user quits.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <slot> <sample>, {} <slot>, {} <slot> <0-1>, {}, {}): ",
            ASSIGN, CLEAR, VOLUME, STATE, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            // EOF behaves like quit.
            events_tx.blocking_send(Event::Quit).map_err(io::Error::other)?;
            return Ok(false);
        }

        match Driver::parse(&input) {
            Some(event) => {
                let keep_going = event != Event::Quit;
                events_tx.blocking_send(event).map_err(io::Error::other)?;
                Ok(keep_going)
            }
            None => {
                if !input.trim().is_empty() {
                    warn!(input = input.trim(), "Unrecognized input");
                }
                Ok(true)
            }
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader, BufWriter};

    use tokio::sync::mpsc;

    use super::*;

    fn get_event(input: &str) -> Result<(bool, Option<Event>), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(input.as_bytes());
        let writer = BufWriter::new(Vec::new());
        let keep_going = Driver::monitor_io(&sender, reader, writer)?;

        // Force the sender to close.
        drop(sender);
        Ok((keep_going, receiver.blocking_recv()))
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(
            (
                true,
                Some(Event::Assign {
                    slot: "char1".into(),
                    sample: "sound1".into()
                })
            ),
            get_event("assign char1 sound1\n")?
        );
        assert_eq!(
            (
                true,
                Some(Event::Clear {
                    slot: "char2".into()
                })
            ),
            get_event("CLEAR char2\n")?
        );
        assert_eq!(
            (
                true,
                Some(Event::Volume {
                    slot: "char3".into(),
                    volume: 0.5
                })
            ),
            get_event("volume char3 0.5\n")?
        );
        assert_eq!((true, Some(Event::State)), get_event("state\n")?);
        assert_eq!((false, Some(Event::Quit)), get_event("quit\n")?);
        Ok(())
    }

    #[test]
    fn test_unrecognized() -> Result<(), io::Error> {
        assert_eq!((true, None), get_event("unrecognized\n")?);
        assert_eq!((true, None), get_event("assign char1\n")?);
        assert_eq!((true, None), get_event("volume char1 loud\n")?);
        assert_eq!((true, None), get_event("\n")?);
        Ok(())
    }

    #[test]
    fn test_eof_quits() -> Result<(), io::Error> {
        assert_eq!((false, Some(Event::Quit)), get_event("")?);
        Ok(())
    }
}
