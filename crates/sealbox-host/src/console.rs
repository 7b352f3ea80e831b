//! Line-oriented operator console.
//!
//! Each line is one command. Parties are given as hex identities; the console
//! plays the client for them, encrypting inputs with the reference engine
//! before handing them to the relay.
//!
//! ```text
//! send 0x0a 0x0b 42        # 0x0a sends 42 to 0x0b
//! reply 0x0b 0 7           # 0x0b replies 7 to record 0
//! inbox 0x0b
//! entry 0x0b 0
//! meta 0
//! record 0
//! decrypt 0x0a reply 0
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use sealbox_core::{Environment, ExternalInput, Identity, InputProof, RecordIndex};
use sealbox_crypto::MemoryEngine;

use crate::{error::HostError, host::RelayHost};

/// Result of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// Text to show the operator. Empty for blank lines.
    Print(String),
    /// Operator asked to leave.
    Quit,
}

#[derive(Debug, Parser)]
#[command(multicall = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Subcommand)]
enum ConsoleCommand {
    /// Send an encrypted value
    Send {
        /// Sending identity (hex)
        #[arg(value_parser = parse_identity)]
        from: Identity,
        /// Recipient identity (hex)
        #[arg(value_parser = parse_identity)]
        to: Identity,
        /// Plaintext value to encrypt
        value: u64,
    },
    /// Reply to a record as its recipient
    Reply {
        /// Replying identity (hex)
        #[arg(value_parser = parse_identity)]
        from: Identity,
        /// Record index
        record: RecordIndex,
        /// Plaintext value to encrypt
        value: u64,
    },
    /// List an inbox
    Inbox {
        /// Inbox owner (hex)
        #[arg(value_parser = parse_identity)]
        who: Identity,
    },
    /// Show one inbox entry
    Entry {
        /// Inbox owner (hex)
        #[arg(value_parser = parse_identity)]
        who: Identity,
        /// Zero-based inbox position
        position: u64,
    },
    /// Show recipient and replied flag of a record
    Meta {
        /// Record index
        record: RecordIndex,
    },
    /// Show a full record
    Record {
        /// Record index
        record: RecordIndex,
    },
    /// Decrypt a stored payload on behalf of an identity
    Decrypt {
        /// Requesting identity (hex)
        #[arg(value_parser = parse_identity)]
        who: Identity,
        /// Which payload of the record
        slot: Slot,
        /// Record index
        record: RecordIndex,
    },
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Slot {
    Message,
    Reply,
}

fn parse_identity(s: &str) -> Result<Identity, String> {
    Identity::from_hex(s).map_err(|e| format!("invalid identity {s:?}: {e}"))
}

/// Console over a host running the reference engine.
#[derive(Clone)]
pub struct Console<E: Environment> {
    host: RelayHost<MemoryEngine<E>>,
}

impl<E: Environment> Console<E> {
    /// Console driving `host`.
    pub fn new(host: RelayHost<MemoryEngine<E>>) -> Self {
        Self { host }
    }

    /// Parses and runs one line.
    ///
    /// Usage errors and `help` come back as [`ConsoleOutcome::Print`]; only
    /// failures of a well-formed command are errors.
    pub async fn execute(&self, line: &str) -> Result<ConsoleOutcome, HostError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(ConsoleOutcome::Print(String::new()));
        }

        let command = match ConsoleLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                let usage = e.render().to_string().trim_end().to_string();
                return Ok(ConsoleOutcome::Print(usage));
            },
        };

        self.run(command).await
    }

    async fn run(&self, command: ConsoleCommand) -> Result<ConsoleOutcome, HostError> {
        let text = match command {
            ConsoleCommand::Send { from, to, value } => {
                let (input, proof) = self.encrypt(value, &from).await?;
                let record = self.host.send_message(&from, to, &input, &proof).await?;
                format!("record {record}")
            },
            ConsoleCommand::Reply { from, record, value } => {
                let (input, proof) = self.encrypt(value, &from).await?;
                self.host.send_reply(&from, record, &input, &proof).await?;
                format!("replied to record {record}")
            },
            ConsoleCommand::Inbox { who } => {
                let entries = self.host.inbox(&who).await;
                if entries.is_empty() {
                    "0 entries".to_string()
                } else {
                    let list: Vec<String> = entries.iter().map(ToString::to_string).collect();
                    format!("{} entries: {}", entries.len(), list.join(", "))
                }
            },
            ConsoleCommand::Entry { who, position } => {
                let record = self.host.inbox_entry(&who, position).await?;
                format!("record {record}")
            },
            ConsoleCommand::Meta { record } => {
                let meta = self.host.metadata(record).await?;
                format!("recipient {} replied {}", meta.recipient, meta.replied)
            },
            ConsoleCommand::Record { record } => {
                let stored = self.host.record(record).await?;
                format!(
                    "sender {} recipient {} message {} reply {} replied {}",
                    stored.sender(),
                    stored.recipient(),
                    stored.encrypted_message(),
                    stored.encrypted_reply(),
                    stored.replied(),
                )
            },
            ConsoleCommand::Decrypt { who, slot, record } => {
                let handle = match slot {
                    Slot::Message => self.host.message_handle(record).await?,
                    Slot::Reply => self.host.reply_handle(record).await?,
                };
                if handle.is_none() {
                    let text = format!("record {record} has no reply yet");
                    return Ok(ConsoleOutcome::Print(text));
                }
                let value = self.host.with_engine(|engine| engine.decrypt(handle, &who)).await?;
                value.to_string()
            },
            ConsoleCommand::Quit => return Ok(ConsoleOutcome::Quit),
        };

        Ok(ConsoleOutcome::Print(text))
    }

    /// Client side of a submission: encrypts `value` bound to `caller`.
    async fn encrypt(
        &self,
        value: u64,
        caller: &Identity,
    ) -> Result<(ExternalInput, InputProof), HostError> {
        let relay = self.host.address().await;
        let sealed = self.host.with_engine(|e| e.encrypt_input(value, &relay, caller)).await?;
        Ok(sealed)
    }
}

impl<E: Environment> std::fmt::Debug for Console<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("host", &self.host).finish()
    }
}
