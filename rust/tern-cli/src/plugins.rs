//! Plugins the `tern` binary loads into every shell.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tern_shell::{wrap_fn, CommandFlow, CommandSpec, Plugin, PluginRegistrar, ShellError};

use crate::colors::Palette;

pub const TIMING_WRAPPER: &str = "timing";

/// Times every evaluation while switched on. `:time` flips the switch.
#[derive(Debug, Clone)]
pub struct TimingPlugin {
    enabled: Arc<AtomicBool>,
    palette: Palette,
}

impl TimingPlugin {
    pub fn new(enabled: bool, palette: Palette) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            palette,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl<A> Plugin<A> for TimingPlugin {
    fn name(&self) -> &str {
        "timing"
    }

    fn load(&self, registrar: &mut PluginRegistrar<'_, A>) -> Result<(), ShellError> {
        let enabled = Arc::clone(&self.enabled);
        let palette = self.palette;
        registrar.register_wrapper(wrap_fn(TIMING_WRAPPER, move |cx, proceed| {
            if !enabled.load(Ordering::Relaxed) {
                return proceed();
            }
            let start = Instant::now();
            let result = proceed();
            let line = format!("line {} took {}", cx.snippet.id, format_elapsed(start.elapsed()));
            eprintln!("{}", palette.gray(&line));
            result
        }))?;

        let enabled = Arc::clone(&self.enabled);
        registrar.register_command(
            CommandSpec::new("time", "Toggle evaluation timing", move |_, args, out| {
                let on = match args.first().map(String::as_str) {
                    None => !enabled.load(Ordering::Relaxed),
                    Some("on") => true,
                    Some("off") => false,
                    Some(other) => {
                        return Err(ShellError::InvalidUsage(format!(
                            "expected 'on' or 'off', found '{}'",
                            other
                        )))
                    }
                };
                enabled.store(on, Ordering::Relaxed);
                writeln!(out, "timing {}", if on { "on" } else { "off" })?;
                Ok(CommandFlow::Continue)
            })
            .usage(":time [on|off]"),
        )
    }
}

/// Screen clearing, as `:clear` / `:c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearPlugin;

impl<A> Plugin<A> for ClearPlugin {
    fn name(&self) -> &str {
        "clear"
    }

    fn load(&self, registrar: &mut PluginRegistrar<'_, A>) -> Result<(), ShellError> {
        registrar.register_command(
            CommandSpec::new("clear", "Clear the screen", |session, _, out| {
                session.clear_buffer();
                write!(out, "\x1b[2J\x1b[H")?;
                Ok(CommandFlow::Continue)
            })
            .alias("c"),
        )
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1_000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_script::{ScriptCompiler, ScriptExecutor};
    use tern_shell::{LineOutcome, MemoryReporter, Session, Shell};

    fn shell() -> (Shell<ScriptCompiler, ScriptExecutor>, MemoryReporter) {
        let reporter = MemoryReporter::new();
        let shell = Shell::new(
            ScriptCompiler::new(),
            ScriptExecutor::new(),
            Arc::new(reporter.clone()),
        );
        (shell, reporter)
    }

    #[test]
    fn elapsed_picks_a_readable_unit() {
        assert_eq!(format_elapsed(Duration::from_micros(250)), "250µs");
        assert_eq!(format_elapsed(Duration::from_micros(1_500)), "1.50ms");
        assert_eq!(format_elapsed(Duration::from_millis(2_250)), "2.25s");
    }

    #[test]
    fn time_directive_toggles_the_wrapper() {
        let (mut shell, reporter) = shell();
        let timing = TimingPlugin::new(false, Palette::plain());
        shell.load_plugin(&timing).unwrap();
        assert_eq!(shell.wrapper_names(), [TIMING_WRAPPER]);

        shell.submit_line(":time").unwrap();
        assert!(timing.is_enabled());
        shell.submit_line(":time off").unwrap();
        assert!(!timing.is_enabled());
        assert_eq!(reporter.output(), "timing on\ntiming off\n");
        assert!(matches!(
            shell.submit_line(":time sometimes"),
            Err(ShellError::InvalidUsage(_))
        ));
    }

    #[test]
    fn timed_evaluation_keeps_its_result() {
        let (mut shell, reporter) = shell();
        shell
            .load_plugin(&TimingPlugin::new(true, Palette::plain()))
            .unwrap();
        assert!(matches!(
            shell.submit_line("2 + 2").unwrap(),
            LineOutcome::Evaluated(_)
        ));
        assert_eq!(reporter.values(), ["res1: Int = 4"]);
    }

    #[test]
    fn clear_has_a_short_alias() {
        let (mut shell, reporter) = shell();
        shell.load_plugin(&ClearPlugin).unwrap();
        shell.submit_line(":c").unwrap();
        assert_eq!(reporter.output(), "\x1b[2J\x1b[H");
    }
}
