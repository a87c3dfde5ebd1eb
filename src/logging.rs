use std::fmt::Display;

use colored::Colorize;
use log::{info, warn, Level};
use studiocard_collab::events::{EventReceiver, StudioEvent};

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

pub fn init_logger() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(|meta| {
            let target = Target::from_str(meta.target());

            let is_allowed = ALLOWED_LEVELS.contains(&meta.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            target.is_local() && is_allowed || is_severe
        })
        .chain(std::io::stdout())
        .apply()
}

/// Logs studio events as they arrive, until the studio is dropped
pub fn log_events(receiver: EventReceiver) {
    for event in receiver.iter() {
        match event {
            StudioEvent::StudentRegistered {
                student_id,
                teacher_id: Some(teacher_id),
            } => info!("Student {} joined the studio of {}", student_id, teacher_id),
            StudioEvent::StudentRegistered { student_id, .. } => {
                info!("Student {} joined", student_id)
            }
            StudioEvent::TeacherRegistered { teacher_id, tier } => {
                info!("Teacher {} opened a {} studio", teacher_id, tier.as_str())
            }
            StudioEvent::Orphaned {
                resource,
                identifier,
            } => warn!(
                "{} {} was left behind and needs cleaning up",
                resource, identifier
            ),
            // Already logged where they happen
            StudioEvent::SignedIn { .. }
            | StudioEvent::TrackUploaded { .. }
            | StudioEvent::LessonCompleted { .. } => {}
        }
    }
}

enum Target {
    External(String),
    Main,
    Server,
    Collab,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "studiocard" => Self::Main,
            "studiocard_server" => Self::Server,
            "studiocard_collab" => Self::Collab,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Main => "MAIN".blue(),
            Target::Server => "SERVER".bright_green(),
            Target::Collab => "COLLAB".bright_purple(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::Target;

    #[test]
    fn recognizes_local_targets() {
        assert!(Target::from_str("studiocard_collab::auth").is_local());
        assert!(Target::from_str("studiocard_server").is_local());
        assert!(!Target::from_str("sqlx::query").is_local());
    }
}
