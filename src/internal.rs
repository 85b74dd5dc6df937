//! The built-in handler.  It is the only one that reads the file, and the
//! coordinator always calls it before any registered plugin.

use std::io::Write;
use tracing::debug;

use crate::cursor::DecodeError;
use crate::export::export_to_path;
use crate::plugin::{Context, Plugin, PluginError, PluginResult};
use crate::print;
use crate::section::{
    decode_dynamic_results, decode_energy_use, decode_epilog, decode_prolog, probe_trailer, Section,
};

#[derive(Debug, Default)]
pub(crate) struct InternalPlugin;

impl InternalPlugin {
    /// Write every configured CSV built from `section`.
    fn export(&mut self, cx: &mut Context<'_>, section: Section) -> PluginResult {
        let cfg = cx.config;
        for (key, path) in cfg.export.for_section(section) {
            if !cfg.display.silent {
                writeln!(cx.out, "Writing {} CSV: {}", key.description(), path.display())?;
            }
            debug!(key = key.name(), path = %path.display(), "exporting");
            export_to_path(key, cx.model, path)?;
        }
        Ok(())
    }
}

impl Plugin for InternalPlugin {
    fn name(&self) -> &str { "internal" }

    fn on_test(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if cx.config.display.verbose {
            if let Some(src) = cx.model.source() {
                writeln!(cx.out, "Loading output file {}", src.path.display())?;
            }
        }
        Ok(())
    }

    fn on_file_init(&mut self, cx: &mut Context<'_>) -> PluginResult {
        let cfg = cx.config;
        if !cfg.display.verbose {
            return Ok(());
        }
        let d = &cfg.display;
        let out = &mut *cx.out;
        if d.prolog {
            writeln!(out, "User requested display of file prolog section")?;
        }
        if d.energy_use {
            writeln!(out, "User requested display of energy use section")?;
        }
        if d.dynamic_results {
            writeln!(out, "User requested display of file dynamic results section")?;
        }
        if d.epilog {
            writeln!(out, "User requested display of file epilog section")?;
        }
        for (key, path) in cfg.export.iter() {
            writeln!(out, "User requested writing of {} as CSV to: {}", key.description(), path.display())?;
        }
        if d.all {
            writeln!(out, "User requested display of content from all file sections")?;
        }
        Ok(())
    }

    /// Verify the file type: the magic number at the head must equal the one
    /// at the tail.  Also learns the period count and warning flag.
    fn on_file_open(&mut self, cx: &mut Context<'_>) -> PluginResult {
        cx.progress.update(5.0, "Verifying file type...");
        let cursor = cx.cursor()?;
        let trailer = probe_trailer(cursor)?;
        cursor.seek_absolute(0)?;
        let head = cursor.read_i32()?;
        if head != trailer.magic {
            return Err(DecodeError::FormatMismatch { head, tail: trailer.magic }.into());
        }
        debug!(periods = trailer.period_count, warning = trailer.warning_flag, "file type verified");
        cx.model.set_trailer(trailer);
        cx.progress.update(100.0, "Verified file type.");

        if cx.config.display.verbose {
            match trailer.period_count {
                1 => writeln!(cx.out, "Analysis had one reporting period")?,
                n => writeln!(cx.out, "Analysis had {n} reporting periods")?,
            }
            writeln!(cx.out, "{}", print::warning_text(trailer.warning_flag))?;
        }
        Ok(())
    }

    fn on_prolog_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        let tail_magic = cx.model.trailer().ok_or(PluginError::MissingSection("trailer"))?.magic;
        cx.progress.update(5.0, "Reading prolog info");
        let cursor = cx.cursor()?;
        cursor.seek_absolute(0)?;
        let prolog = decode_prolog(cursor, tail_magic)?;
        debug!(
            nodes = prolog.node_count(), links = prolog.link_count(),
            tanks = prolog.tank_reservoir_count(), pumps = prolog.pump_count(),
            "prolog decoded",
        );
        cx.model.set_prolog(prolog);
        cx.progress.update(100.0, "Read prolog info");
        Ok(())
    }

    fn on_prolog_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if cx.config.print_prolog() {
            let prolog = cx.model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
            print::write_prolog(cx.out, prolog)?;
        }
        Ok(())
    }

    fn on_prolog_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.export(cx, Section::Prolog)
    }

    fn on_energy_use_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        cx.progress.update(5.0, "Reading energy usage");
        let Context { model, cursor, .. } = cx;
        let cursor = cursor.as_deref_mut().ok_or_else(|| PluginError::Failed("file is not open".into()))?;
        let prolog = model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
        let energy = decode_energy_use(cursor, prolog)?;
        debug!(pumps = energy.pumps.len(), "energy use decoded");
        model.set_energy_use(energy);
        cx.progress.update(100.0, "Read energy usage");
        Ok(())
    }

    fn on_energy_use_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if cx.config.print_energy_use() {
            let prolog = cx.model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
            let energy = cx.model.energy_use().ok_or(PluginError::MissingSection("EnergyUse"))?;
            print::write_energy_use(cx.out, prolog, energy)?;
        }
        Ok(())
    }

    fn on_energy_use_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.export(cx, Section::EnergyUse)
    }

    fn on_dynamic_results_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        let Context { model, progress, cursor, .. } = cx;
        let cursor = cursor.as_deref_mut().ok_or_else(|| PluginError::Failed("file is not open".into()))?;
        let prolog = model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
        let period_count = model.trailer().ok_or(PluginError::MissingSection("trailer"))?.period_count;

        progress.update(0.0, "Reading dynamic results");
        let mut last = 0usize;
        let periods = decode_dynamic_results(cursor, prolog, period_count, |done, total| {
            let percent = 100 * done / total;
            if percent > last + 2 {
                progress.update(percent as f64, &format!("Reading dynamic results timestep {done}"));
                last = percent;
            }
        })?;
        debug!(periods = periods.len(), "dynamic results decoded");
        model.set_dynamic_results(periods);
        progress.update(100.0, "Finished reading dynamic results");
        Ok(())
    }

    fn on_dynamic_results_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if cx.config.print_dynamic_results() {
            let prolog = cx.model.prolog().ok_or(PluginError::MissingSection("Prolog"))?;
            let periods = cx.model.dynamic_results().ok_or(PluginError::MissingSection("DynamicResults"))?;
            print::write_dynamic_results(cx.out, prolog, periods)?;
        }
        Ok(())
    }

    fn on_dynamic_results_export(&mut self, cx: &mut Context<'_>) -> PluginResult {
        self.export(cx, Section::DynamicResults)
    }

    /// The epilog follows the last period directly.  Its period count and
    /// magic number must agree with the values probed at open.
    fn on_epilog_read(&mut self, cx: &mut Context<'_>) -> PluginResult {
        cx.progress.update(5.0, "Reading epilog");
        let Context { model, cursor, .. } = cx;
        let cursor = cursor.as_deref_mut().ok_or_else(|| PluginError::Failed("file is not open".into()))?;
        let trailer = *model.trailer().ok_or(PluginError::MissingSection("trailer"))?;
        let magic = model.prolog().ok_or(PluginError::MissingSection("Prolog"))?.magic();
        let epilog = decode_epilog(cursor, &trailer, magic)?;
        model.set_epilog(epilog);
        cx.progress.update(100.0, "Finished reading epilog");
        Ok(())
    }

    fn on_epilog_print(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if cx.config.print_epilog() {
            let epilog = cx.model.epilog().ok_or(PluginError::MissingSection("Epilog"))?;
            print::write_epilog(cx.out, epilog)?;
        }
        Ok(())
    }

    fn on_file_close(&mut self, cx: &mut Context<'_>) -> PluginResult {
        if !cx.config.display.silent {
            writeln!(cx.out, "Done.")?;
        }
        Ok(())
    }
}
