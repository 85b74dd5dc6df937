//! Load driver.
//!
//! A [`Coordinator`] owns the result model, the built-in decoder and the
//! registered plugins.  [`Coordinator::load`] opens one file and walks the
//! fixed message sequence (see [`crate::plugin`]), giving every step its own
//! slice of the 0–100 progress scale:
//!
//! | Message                | built-in | plugins |
//! |------------------------|----------|---------|
//! | Test                   | 0–0      | 0–1     |
//! | FileInit               | 1–1      | 1–2     |
//! | FileOpen               | 2–5      | 6–9     |
//! | PrologRead             | 10–14    | 15–16   |
//! | PrologPrint            | 16–17    | 17–18   |
//! | PrologExport           | 18–20    | 20–21   |
//! | EnergyUseRead          | 21–22    | 22–23   |
//! | EnergyUsePrint         | 23–24    | 24–25   |
//! | EnergyUseExport        | 25–26    | 26–27   |
//! | DynamicResultsRead     | 27–75    | 75–83   |
//! | DynamicResultsPrint    | 83–84    | 84–85   |
//! | DynamicResultsExport   | 85–87    | 87–89   |
//! | EpilogRead             | 90–92    | 92–93   |
//! | EpilogPrint            | 93–94    | 94–95   |
//! | EpilogExport           | 95–96    | 96–97   |
//! | FileClose              | 97–98    | 98–99   |
//! | FileTerm               | 99–99    | 99–100  |
//!
//! The plugins' slice is split evenly between them in registration order.
//!
//! Any failure in the built-in decoder ends the load: the file is closed,
//! the model is discarded and no further messages are sent.  A failing
//! plugin is logged and skipped for the rest of that load; everything else
//! carries on.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::cursor::{Cursor, DecodeError};
use crate::internal::InternalPlugin;
use crate::model::{ResultModel, SourceInfo};
use crate::options::{OptionError, OptionRegistry};
use crate::plugin::{deliver, Action, Context, Message, Plugin, PluginError, PluginRegistry};
use crate::progress::Progress;
use crate::section::Section;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{stage}: {source}")]
    Decode { stage: Message, source: DecodeError },
    #[error("{stage}: {source}")]
    Plugin { stage: Message, source: PluginError },
    #[error(transparent)]
    Option(#[from] OptionError),
}

impl LoadError {
    fn internal(stage: Message, err: PluginError) -> Self {
        match err {
            PluginError::Decode(source) => LoadError::Decode { stage, source },
            source => LoadError::Plugin { stage, source },
        }
    }

    /// The decode failure behind this error, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            LoadError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadState {
    Created,
    Initialized,
    FileValidated,
    PrologDecoded,
    EnergyDecoded,
    DynamicsDecoded,
    EpilogDecoded,
    Closed,
    Terminated,
}

impl LoadState {
    fn after_read(section: Section) -> Self {
        match section {
            Section::Prolog         => LoadState::PrologDecoded,
            Section::EnergyUse      => LoadState::EnergyDecoded,
            Section::DynamicResults => LoadState::DynamicsDecoded,
            Section::Epilog         => LoadState::EpilogDecoded,
        }
    }
}

/// Progress slices for the built-in decoder and for the plugins.
fn step_ranges(msg: Message) -> ((f64, f64), (f64, f64)) {
    use Action::*;
    use Section::*;
    match msg {
        Message::Test                            => ((0.0, 0.0), (0.0, 1.0)),
        Message::FileInit                        => ((1.0, 1.0), (1.0, 2.0)),
        Message::FileOpen                        => ((2.0, 5.0), (6.0, 9.0)),
        Message::Section(Prolog, Read)           => ((10.0, 14.0), (15.0, 16.0)),
        Message::Section(Prolog, Print)          => ((16.0, 17.0), (17.0, 18.0)),
        Message::Section(Prolog, Export)         => ((18.0, 20.0), (20.0, 21.0)),
        Message::Section(EnergyUse, Read)        => ((21.0, 22.0), (22.0, 23.0)),
        Message::Section(EnergyUse, Print)       => ((23.0, 24.0), (24.0, 25.0)),
        Message::Section(EnergyUse, Export)      => ((25.0, 26.0), (26.0, 27.0)),
        Message::Section(DynamicResults, Read)   => ((27.0, 75.0), (75.0, 83.0)),
        Message::Section(DynamicResults, Print)  => ((83.0, 84.0), (84.0, 85.0)),
        Message::Section(DynamicResults, Export) => ((85.0, 87.0), (87.0, 89.0)),
        Message::Section(Epilog, Read)           => ((90.0, 92.0), (92.0, 93.0)),
        Message::Section(Epilog, Print)          => ((93.0, 94.0), (94.0, 95.0)),
        Message::Section(Epilog, Export)         => ((95.0, 96.0), (96.0, 97.0)),
        Message::FileClose                       => ((97.0, 98.0), (98.0, 99.0)),
        Message::FileTerm                        => ((99.0, 99.0), (99.0, 100.0)),
    }
}

struct Slot {
    plugin:      Box<dyn Plugin>,
    initialized: bool,
    /// Cleared for the rest of a load once the plugin fails.
    active:      bool,
}

pub struct Coordinator {
    internal: InternalPlugin,
    plugins:  Vec<Slot>,
    options:  OptionRegistry,
    model:    ResultModel,
    state:    LoadState,
    out:      Box<dyn Write>,
}

impl Coordinator {
    /// Take ownership of `registry` and run every plugin's `on_init` once.
    /// A plugin whose `on_init` fails is logged and never called again.
    pub fn new(registry: PluginRegistry) -> Self {
        let mut options = OptionRegistry::new();
        let mut plugins = Vec::with_capacity(registry.len());
        for mut plugin in registry.into_inner() {
            let name = plugin.name().to_string();
            let initialized = match plugin.on_init(&mut options.scope(&name)) {
                Ok(()) => true,
                Err(e) => {
                    warn!(plugin = %name, error = %e, "plugin failed to initialise; disabled");
                    false
                }
            };
            plugins.push(Slot { plugin, initialized, active: initialized });
        }
        debug!(plugins = plugins.len(), options = options.specs().len(), "coordinator initialised");
        Self {
            internal: InternalPlugin,
            plugins,
            options,
            model: ResultModel::default(),
            state: LoadState::Initialized,
            out: Box::new(io::stdout()),
        }
    }

    /// Send printed reports to `out` instead of stdout.
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Options declared by the plugins during initialisation.
    pub fn options(&self) -> &OptionRegistry { &self.options }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|s| s.plugin.name())
    }

    pub fn state(&self) -> LoadState { self.state }

    /// The model of the last load, only once that load has completed.
    pub fn model(&self) -> Option<&ResultModel> {
        (self.state == LoadState::Terminated).then_some(&self.model)
    }

    /// Decode `path`, sending every lifecycle message to the built-in
    /// decoder and the plugins.  On error nothing of the file is kept.
    pub fn load(
        &mut self,
        path:     impl AsRef<Path>,
        config:   &LoadConfig,
        progress: &mut Progress,
    ) -> Result<&ResultModel, LoadError> {
        let path = path.as_ref();
        let config = config.normalized();
        for (name, value) in config.plugin_options.iter() {
            self.options.check(name, value)?;
        }

        self.model = ResultModel::default();
        self.state = LoadState::Initialized;
        for slot in &mut self.plugins {
            slot.active = slot.initialized;
        }

        info!(path = %path.display(), "loading output file");
        match self.run(path, &config, progress) {
            Ok(()) => {
                self.state = LoadState::Terminated;
                self.out.flush()?;
                Ok(&self.model)
            }
            Err(e) => {
                debug!(error = %e, state = ?self.state, "load aborted");
                self.model = ResultModel::default();
                self.state = LoadState::Initialized;
                let _ = self.out.flush();
                Err(e)
            }
        }
    }

    fn run(&mut self, path: &Path, config: &LoadConfig, progress: &mut Progress) -> Result<(), LoadError> {
        let Coordinator { internal, plugins, model, state, out, .. } = self;

        let size = std::fs::metadata(path)?.len();
        model.set_source(SourceInfo { path: path.to_path_buf(), size });

        let mut session = Session { model, progress, config, out: &mut **out, cursor: None };
        session.send(internal, plugins, Message::Test)?;
        session.send(internal, plugins, Message::FileInit)?;

        // Dropping the cursor closes the file, on every exit path.
        let file = File::open(path)?;
        session.cursor = Some(
            Cursor::new(BufReader::new(file))
                .map_err(|source| LoadError::Decode { stage: Message::FileOpen, source })?,
        );
        session.send(internal, plugins, Message::FileOpen)?;
        *state = LoadState::FileValidated;

        for section in Section::ALL {
            for action in Action::ALL {
                session.send(internal, plugins, Message::Section(section, action))?;
                if action == Action::Read {
                    *state = LoadState::after_read(section);
                }
            }
        }
        session.progress.update(100.0, "Finished reading file");

        session.cursor = None;
        *state = LoadState::Closed;
        session.send(internal, plugins, Message::FileClose)?;
        session.send(internal, plugins, Message::FileTerm)?;
        Ok(())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("plugins", &self.plugin_names().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish()
    }
}

/// Borrowed state of one load in progress.
struct Session<'a> {
    model:    &'a mut ResultModel,
    progress: &'a mut Progress,
    config:   &'a LoadConfig,
    out:      &'a mut dyn Write,
    cursor:   Option<Cursor<BufReader<File>>>,
}

impl Session<'_> {
    /// Deliver `msg` to the built-in decoder, then fan it out to the plugins.
    fn send(&mut self, internal: &mut InternalPlugin, plugins: &mut [Slot], msg: Message) -> Result<(), LoadError> {
        let (own, theirs) = step_ranges(msg);
        debug!(message = %msg, "dispatch");

        self.progress.set_range(own.0, own.1);
        let mut cx = Context {
            model:    &mut *self.model,
            progress: &mut *self.progress,
            config:   self.config,
            out:      &mut *self.out,
            cursor:   self.cursor.as_mut(),
        };
        deliver(internal, msg, &mut cx).map_err(|e| LoadError::internal(msg, e))?;

        self.progress.set_range(theirs.0, theirs.1);
        let Session { model, progress, config, out, .. } = self;
        progress.fan_out(plugins.len(), |i, progress| {
            let slot = &mut plugins[i];
            if !slot.active {
                return;
            }
            let mut cx = Context {
                model:  &mut **model,
                progress,
                config: *config,
                out:    &mut **out,
                cursor: None,
            };
            if let Err(e) = deliver(slot.plugin.as_mut(), msg, &mut cx) {
                warn!(
                    plugin = slot.plugin.name(), message = %msg, error = %e,
                    "plugin failed; skipped for the rest of this load",
                );
                slot.active = false;
            }
        });
        Ok(())
    }
}

/// Decode `path` with no plugins, no output and no progress reporting.
pub fn decode_file(path: impl AsRef<Path>) -> Result<ResultModel, LoadError> {
    let mut c = Coordinator::new(PluginRegistry::new()).with_output(Box::new(io::sink()));
    c.load(path, &LoadConfig::silent(), &mut Progress::silent())?;
    c.state = LoadState::Initialized;
    Ok(std::mem::take(&mut c.model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::allocate;

    #[test]
    fn ranges_stay_in_bounds_and_move_forward() {
        let mut last = 0.0;
        for msg in Message::sequence() {
            let ((a, b), (c, d)) = step_ranges(msg);
            assert!(a <= b && b <= c && c <= d && d <= 100.0, "{msg}");
            assert!(a >= last, "{msg}");
            last = c;
        }
    }

    #[test]
    fn user_slice_splits_between_plugins() {
        let (_, (lo, hi)) = step_ranges(Message::Section(Section::DynamicResults, Action::Read));
        assert_eq!(allocate(lo, hi, 2), vec![(75.0, 79.0), (79.0, 83.0)]);
    }

    #[test]
    fn internal_errors_keep_their_stage() {
        let e = LoadError::internal(
            Message::FileOpen,
            PluginError::Decode(DecodeError::FormatMismatch { head: 1, tail: 2 }),
        );
        assert!(matches!(e.decode_error(), Some(DecodeError::FormatMismatch { .. })));
        assert!(e.to_string().starts_with("FileOpen: "));

        let e = LoadError::internal(Message::FileClose, PluginError::Failed("x".into()));
        assert!(matches!(e, LoadError::Plugin { stage: Message::FileClose, .. }));
    }
}
