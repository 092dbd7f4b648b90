use crate::catalog::Command;
use crate::units::format_number;

/// Formats recorded command streams into timestamped, human-readable timelines.
pub struct TimelineFormatter;

impl TimelineFormatter {
    /// Renders one `"<elapsed>ms:<command>"` line per command.
    ///
    /// `timeStep()` calls are not printed; each one advances the clock by the interval of
    /// the most recent `setTimeStep`. Commands before any time step declaration sit at 0ms.
    pub fn format(commands: &[Command]) -> String {
        Self::lines(commands).join("\n")
    }

    /// The individual timeline lines, without separators.
    pub fn lines(commands: &[Command]) -> Vec<String> {
        let mut interval = 0.0;
        let mut elapsed = 0.0;
        let mut lines = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                Command::TimeStep => {
                    elapsed += interval;
                    continue;
                }
                Command::SetTimeStep { millis } => interval = *millis,
                _ => {}
            }
            lines.push(format!("{}ms:{}", format_number(elapsed), command));
        }
        lines
    }
}
