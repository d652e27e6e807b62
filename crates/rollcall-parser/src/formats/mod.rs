mod attendance;
mod class_rank;
mod common;
mod email;
mod gpa;
mod grades;
mod sat;
pub mod schema;
mod service;
mod swipe;

pub use attendance::{WeeklyAttendanceReader, YearToDateAttendanceReader};
pub use class_rank::ClassRankReader;
pub use email::EmailReader;
pub use gpa::GpaReader;
pub use grades::{decile, letter_for_decile, CurrentGradesReader, DoublePeriod, PeriodLayout};
pub use sat::SatReader;
pub use service::ServiceLearningReader;
pub use swipe::{LateWindow, SwipeReader};

pub(crate) use common::{
    load_rows, parse_optional_f64, parse_optional_percent, parse_required_i64, parse_student_id,
    round_to,
};
