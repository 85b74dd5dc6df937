//! Lifecycle protocol between the coordinator and its handlers.
//!
//! A handler implements [`Plugin`] and overrides only the callbacks it cares
//! about; every callback defaults to a no-op.  For each load the coordinator
//! sends the messages below in this order, each one first to the built-in
//! decoder and then to every registered plugin in registration order:
//!
//! ```text
//! Test → FileInit → FileOpen
//!      → PrologRead → PrologPrint → PrologExport
//!      → EnergyUseRead → EnergyUsePrint → EnergyUseExport
//!      → DynamicResultsRead → DynamicResultsPrint → DynamicResultsExport
//!      → EpilogRead → EpilogPrint → EpilogExport
//!      → FileClose → FileTerm
//! ```
//!
//! `on_init` is not part of the per-load sequence: it runs once, when the
//! coordinator is built, and is where a plugin declares its options.
//!
//! By the time a plugin sees `XRead`, section X is in the model.

use std::fs::File;
use std::io::{self, BufReader, Write};
use thiserror::Error;

use crate::config::LoadConfig;
use crate::cursor::{Cursor, DecodeError};
use crate::export::ExportError;
use crate::model::ResultModel;
use crate::options::OptionScope;
use crate::progress::Progress;
use crate::section::Section;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0} section is not available")]
    MissingSection(&'static str),
    #[error("{0}")]
    Failed(String),
}

pub type PluginResult = Result<(), PluginError>;

/// What a per-section message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Print,
    Export,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Read, Action::Print, Action::Export];
}

/// Per-load lifecycle messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    Test,
    FileInit,
    FileOpen,
    Section(Section, Action),
    FileClose,
    FileTerm,
}

impl Message {
    /// All messages of one load, in delivery order.
    pub fn sequence() -> Vec<Message> {
        let mut seq = vec![Message::Test, Message::FileInit, Message::FileOpen];
        for section in Section::ALL {
            for action in Action::ALL {
                seq.push(Message::Section(section, action));
            }
        }
        seq.push(Message::FileClose);
        seq.push(Message::FileTerm);
        seq
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Test      => f.write_str("Test"),
            Message::FileInit  => f.write_str("FileInit"),
            Message::FileOpen  => f.write_str("FileOpen"),
            Message::Section(s, a) => write!(f, "{}{:?}", s.name(), a),
            Message::FileClose => f.write_str("FileClose"),
            Message::FileTerm  => f.write_str("FileTerm"),
        }
    }
}

/// Everything a callback can reach during one load.
///
/// Plugins get the model read-only; only the built-in decoder writes to it
/// and reads the file.
pub struct Context<'a> {
    pub(crate) model:    &'a mut ResultModel,
    pub(crate) progress: &'a mut Progress,
    pub(crate) config:   &'a LoadConfig,
    pub(crate) out:      &'a mut dyn Write,
    pub(crate) cursor:   Option<&'a mut Cursor<BufReader<File>>>,
}

impl<'a> Context<'a> {
    pub fn model(&self) -> &ResultModel { &*self.model }

    pub fn config(&self) -> &LoadConfig { self.config }

    /// Progress scaled to this callback's share of the overall range.
    pub fn progress(&mut self) -> &mut Progress { &mut *self.progress }

    /// Text output shared by all handlers (stdout for the CLI).
    pub fn out(&mut self) -> &mut dyn Write { &mut *self.out }

    pub(crate) fn cursor(&mut self) -> Result<&mut Cursor<BufReader<File>>, PluginError> {
        self.cursor.as_deref_mut().ok_or_else(|| PluginError::Failed("file is not open".into()))
    }
}

/// A lifecycle handler.  Every callback defaults to doing nothing.
pub trait Plugin {
    /// Short lowercase name; also the required prefix of its option names.
    fn name(&self) -> &str;

    fn on_init(&mut self, _options: &mut OptionScope<'_>) -> PluginResult { Ok(()) }

    fn on_test(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_file_init(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_file_open(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }

    fn on_prolog_read(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_prolog_print(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_prolog_export(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }

    fn on_energy_use_read(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_energy_use_print(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_energy_use_export(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }

    fn on_dynamic_results_read(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_dynamic_results_print(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_dynamic_results_export(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }

    fn on_epilog_read(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_epilog_print(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_epilog_export(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }

    fn on_file_close(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
    fn on_file_term(&mut self, _cx: &mut Context<'_>) -> PluginResult { Ok(()) }
}

/// Route `msg` to the matching callback.
pub(crate) fn deliver<P: Plugin + ?Sized>(plugin: &mut P, msg: Message, cx: &mut Context<'_>) -> PluginResult {
    use Action::*;
    use Section::*;
    match msg {
        Message::Test      => plugin.on_test(cx),
        Message::FileInit  => plugin.on_file_init(cx),
        Message::FileOpen  => plugin.on_file_open(cx),
        Message::Section(Prolog, Read)           => plugin.on_prolog_read(cx),
        Message::Section(Prolog, Print)          => plugin.on_prolog_print(cx),
        Message::Section(Prolog, Export)         => plugin.on_prolog_export(cx),
        Message::Section(EnergyUse, Read)        => plugin.on_energy_use_read(cx),
        Message::Section(EnergyUse, Print)       => plugin.on_energy_use_print(cx),
        Message::Section(EnergyUse, Export)      => plugin.on_energy_use_export(cx),
        Message::Section(DynamicResults, Read)   => plugin.on_dynamic_results_read(cx),
        Message::Section(DynamicResults, Print)  => plugin.on_dynamic_results_print(cx),
        Message::Section(DynamicResults, Export) => plugin.on_dynamic_results_export(cx),
        Message::Section(Epilog, Read)           => plugin.on_epilog_read(cx),
        Message::Section(Epilog, Print)          => plugin.on_epilog_print(cx),
        Message::Section(Epilog, Export)         => plugin.on_epilog_export(cx),
        Message::FileClose => plugin.on_file_close(cx),
        Message::FileTerm  => plugin.on_file_term(cx),
    }
}

/// Ordered set of external plugins handed to the coordinator.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn len(&self) -> usize { self.plugins.len() }

    pub fn is_empty(&self) -> bool { self.plugins.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    pub(crate) fn into_inner(self) -> Vec<Box<dyn Plugin>> { self.plugins }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
