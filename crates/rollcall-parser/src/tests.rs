use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::errors::ParserError;
use crate::formats::{
    decile, letter_for_decile, ClassRankReader, CurrentGradesReader, EmailReader, GpaReader,
    LateWindow, PeriodLayout, SatReader, ServiceLearningReader, SwipeReader,
    WeeklyAttendanceReader, YearToDateAttendanceReader,
};
use crate::model::{Cell, GradeLevel, ReportingPeriod, SourceTable, StudentId};
use crate::registry::{all_schemas, SourceReader};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn text(table: &SourceTable, id: i64, column: &str) -> Option<String> {
    table
        .cell(StudentId(id), column)
        .unwrap_or_else(|| panic!("no {column} cell for {id}"))
        .render()
}

fn period() -> ReportingPeriod {
    ReportingPeriod {
        start: NaiveDate::from_ymd_opt(2018, 3, 26).unwrap(),
        end: NaiveDate::from_ymd_opt(2018, 3, 30).unwrap(),
    }
}

const SWIPE_HEADER: &str = "Textbox20,Textbox12,Textbox14,Type\n";

#[test]
fn gpa_rounds_to_two_places() {
    let table = GpaReader.parse(&fixture("gpa.csv")).expect("GPA parse failed");

    assert_eq!(table.len(), 5);
    assert_eq!(
        table.cell(StudentId(100001), "avg_gpa"),
        Some(&Cell::Float(3.46))
    );
    assert_eq!(
        table.cell(StudentId(100003), "avg_gpa"),
        Some(&Cell::Float(4.0))
    );
    assert_eq!(
        table.cell(StudentId(100004), "grade"),
        Some(&Cell::Integer(11))
    );
    assert_eq!(text(&table, 100002, "last_name").as_deref(), Some("Chen"));
    assert!(table.columns()[1].identifying);
}

#[test]
fn gpa_rejects_grade_outside_high_school() {
    let content = "STUDENT ID,GRADE LEVEL,LAST NAME,FIRST NAME,AVG GPA\n100009,8,Doe,Jo,3.0\n";
    match GpaReader.parse(content) {
        Err(ParserError::Unmappable { value, line_index, .. }) => {
            assert_eq!(value, "8");
            assert_eq!(line_index, 2);
        }
        other => panic!("expected Unmappable error, got {other:?}"),
    }
}

#[test]
fn gpa_missing_column_is_a_shape_error() {
    let content = "STUDENT ID,GRADE LEVEL,LAST NAME,AVG GPA\n100001,9,Rivera,3.1\n";
    match GpaReader.parse(content) {
        Err(ParserError::ColumnShape { schema, reason, .. }) => {
            assert_eq!(schema, "gpa");
            assert!(reason.contains("FIRST NAME"), "unexpected reason: {reason}");
        }
        other => panic!("expected ColumnShape error, got {other:?}"),
    }
}

#[test]
fn duplicate_student_rows_are_rejected() {
    let content = "STUDENT ID,GRADE LEVEL,LAST NAME,FIRST NAME,AVG GPA\n\
                   100001,9,Rivera,Ana,3.4\n\
                   100001,9,Rivera,Ana,3.5\n";
    match GpaReader.parse(content) {
        Err(ParserError::DuplicateStudent {
            student_id,
            first_line,
            line_index,
            ..
        }) => {
            assert_eq!(student_id, 100001);
            assert_eq!(first_line, 2);
            assert_eq!(line_index, 3);
        }
        other => panic!("expected DuplicateStudent error, got {other:?}"),
    }
}

#[test]
fn header_only_file_is_empty_data() {
    let content = "STUDENT ID,GRADE LEVEL,LAST NAME,FIRST NAME,AVG GPA\n";
    assert!(matches!(
        GpaReader.parse(content),
        Err(ParserError::EmptyData { .. })
    ));
}

#[test]
fn class_rank_reads_fixed_offsets() {
    let table = ClassRankReader
        .parse(&fixture("class_rank.csv"))
        .expect("class rank parse failed");

    assert_eq!(table.len(), 5);
    assert_eq!(
        table.cell(StudentId(100001), "unweighted_gpa"),
        Some(&Cell::Float(3.21))
    );
    assert_eq!(
        table.cell(StudentId(100003), "class_rank"),
        Some(&Cell::Integer(3))
    );
    assert_eq!(
        table.cell(StudentId(100005), "class_size"),
        Some(&Cell::Integer(250))
    );
    assert_eq!(
        table.cell(StudentId(100002), "credits_earned"),
        Some(&Cell::Float(6.5))
    );
}

#[test]
fn class_rank_detects_reordered_columns() {
    let content = fixture("class_rank.csv").replacen("Class Rank,Class Size", "Class Size,Class Rank", 1);
    match ClassRankReader.parse(&content) {
        Err(ParserError::ColumnShape { reason, .. }) => {
            assert!(reason.contains("offset 20"), "unexpected reason: {reason}");
        }
        other => panic!("expected ColumnShape error, got {other:?}"),
    }
}

#[test]
fn class_rank_short_row_is_a_data_row_error() {
    let content = fixture("class_rank.csv");
    let mut lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();
    if let Some((prefix, _)) = lines[2].rsplit_once(',') {
        lines[2] = prefix.to_string();
    }
    let truncated = lines.join("\n") + "\n";

    match ClassRankReader.parse(&truncated) {
        Err(ParserError::DataRow { line_index, .. }) => assert_eq!(line_index, 3),
        other => panic!("expected DataRow error, got {other:?}"),
    }
}

#[test]
fn weekly_attendance_stamps_reporting_period() {
    let table = WeeklyAttendanceReader::new(period())
        .parse(&fixture("weekly_attendance.csv"))
        .expect("weekly attendance parse failed");

    assert_eq!(
        table.cell(StudentId(100002), "weekly_attn"),
        Some(&Cell::Float(80.0))
    );
    assert_eq!(table.cell(StudentId(100005), "weekly_attn"), Some(&Cell::Missing));
    assert_eq!(text(&table, 100001, "week").as_deref(), Some("Week 31"));
    assert_eq!(
        text(&table, 100004, "start_date").as_deref(),
        Some("March 26, 2018")
    );
    assert_eq!(
        text(&table, 100004, "end_date").as_deref(),
        Some("March 30, 2018")
    );
}

#[test]
fn ytd_attendance_keeps_only_home_school() {
    let table = YearToDateAttendanceReader::new("HYDE PARK HS")
        .parse(&fixture("ytd_attendance.csv"))
        .expect("ytd attendance parse failed");

    assert_eq!(table.len(), 5);
    assert!(table.row(StudentId(100006)).is_none());
    assert_eq!(
        table.cell(StudentId(100002), "ytd_attn"),
        Some(&Cell::Float(88.25))
    );
    assert_eq!(
        table.cell(StudentId(100003), "ytd_attn"),
        Some(&Cell::Float(99.1))
    );
    let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ytd_attn"]);
}

#[test]
fn swipe_window_bounds_are_inclusive() {
    let content = format!(
        "{SWIPE_HEADER}\
         \"200001 EARLY, A\",03/26/2018,08:59:59,Late\n\
         \"200002 OPEN, B\",03/26/2018,09:00:00,Late\n\
         \"200003 CLOSE, C\",03/26/2018,10:30:00,Late\n\
         \"200004 AFTER, D\",03/26/2018,10:31:00,Late\n"
    );
    let table = SwipeReader::default()
        .parse(&content)
        .expect("swipe parse failed");

    assert!(table.row(StudentId(200001)).is_none());
    assert!(table.row(StudentId(200002)).is_some());
    assert!(table.row(StudentId(200003)).is_some());
    assert!(table.row(StudentId(200004)).is_none());
    assert_eq!(text(&table, 200003, "late_time").as_deref(), Some("10:30 AM"));
}

#[test]
fn swipe_collects_every_late_arrival_in_order() {
    let table = SwipeReader::default()
        .parse(&fixture("swipe.csv"))
        .expect("swipe parse failed");

    assert_eq!(table.len(), 3);
    assert_eq!(
        text(&table, 100001, "late_date").as_deref(),
        Some("March 26, March 28")
    );
    assert_eq!(
        text(&table, 100001, "late_time").as_deref(),
        Some("09:15 AM, 09:45 AM")
    );
    assert_eq!(text(&table, 100005, "late_time").as_deref(), Some("09:00 AM"));
    // 10:31 and an afternoon swipe
    assert!(table.row(StudentId(100004)).is_none());
}

#[test]
fn swipe_window_is_configurable() {
    let reader = SwipeReader::new(LateWindow {
        start: 800,
        end: 900,
    });
    let table = reader.parse(&fixture("swipe.csv")).expect("swipe parse failed");

    assert_eq!(table.len(), 2);
    assert!(table.row(StudentId(100002)).is_some());
    assert!(table.row(StudentId(100005)).is_some());
}

#[test]
fn swipe_malformed_time_is_fatal() {
    let content = format!("{SWIPE_HEADER}\"200001 LATE, A\",03/26/2018,quarter past nine,Late\n");
    match SwipeReader::default().parse(&content) {
        Err(ParserError::DataRow { message, .. }) => {
            assert!(message.contains("invalid swipe time"), "unexpected message: {message}");
        }
        other => panic!("expected DataRow error, got {other:?}"),
    }
}

#[test]
fn swipe_unparseable_student_is_fatal() {
    let content = format!("{SWIPE_HEADER}\"VISITOR PASS\",03/26/2018,09:10:00,Late\n");
    assert!(matches!(
        SwipeReader::default().parse(&content),
        Err(ParserError::DataRow { .. })
    ));
}

#[test]
fn sat_scores_are_pending_until_released() {
    let reader = SatReader::new(GradeLevel::Nine, false, "Scores coming in mid-May");
    let table = reader
        .parse(&fixture("sat_grade9.csv"))
        .expect("SAT parse failed");

    // the row without an ID is dropped
    assert_eq!(table.len(), 2);

    let total = table.cell(StudentId(100001), "sat_total").expect("missing cell");
    assert_eq!(
        total,
        &Cell::Pending {
            parsed: Some(1010),
            placeholder: "Scores coming in mid-May".to_string(),
        }
    );
    assert_eq!(total.render().as_deref(), Some("Scores coming in mid-May"));
    assert_eq!(
        table.row(StudentId(100002)).and_then(|row| row.grade_hint),
        Some(GradeLevel::Nine)
    );
}

#[test]
fn released_sat_scores_keep_numbers() {
    let reader = SatReader::new(GradeLevel::Eleven, true, "Scores coming in mid-May");
    let table = reader
        .parse(&fixture("sat_grade11.csv"))
        .expect("SAT parse failed");

    assert_eq!(
        table.cell(StudentId(100004), "sat_erw"),
        Some(&Cell::Integer(470))
    );
    assert_eq!(table.cell(StudentId(100004), "sat_math"), Some(&Cell::Missing));
}

#[test]
fn sat_extracts_union_across_grades() {
    let nine = SatReader::new(GradeLevel::Nine, false, "pending")
        .parse(&fixture("sat_grade9.csv"))
        .expect("grade 9 parse failed");
    let ten = SatReader::new(GradeLevel::Ten, false, "pending")
        .parse(&fixture("sat_grade10.csv"))
        .expect("grade 10 parse failed");

    let combined = nine.union("SAT", ten).expect("union failed");
    assert_eq!(combined.len(), 3);
    assert_eq!(
        combined.row(StudentId(100003)).and_then(|row| row.grade_hint),
        Some(GradeLevel::Ten)
    );

    let again = SatReader::new(GradeLevel::Ten, false, "pending")
        .parse(&fixture("sat_grade10.csv"))
        .expect("grade 10 parse failed");
    assert!(matches!(
        combined.union("SAT", again),
        Err(ParserError::DuplicateStudent { student_id: 100003, .. })
    ));
}

#[test]
fn service_hours_read_by_offset() {
    let table = ServiceLearningReader::new(GradeLevel::Twelve)
        .parse(&fixture("service_grade12.csv"))
        .expect("service parse failed");

    assert_eq!(
        table.cell(StudentId(100005), "service_hours"),
        Some(&Cell::Float(40.0))
    );
    assert_eq!(
        table.row(StudentId(100006)).and_then(|row| row.grade_hint),
        Some(GradeLevel::Twelve)
    );

    let blank_rows = ServiceLearningReader::new(GradeLevel::Nine)
        .parse(&fixture("service_grade9.csv"))
        .expect("service parse failed");
    assert_eq!(blank_rows.len(), 2);
}

#[test]
fn deciles_map_to_letters() {
    assert_eq!(decile(85.0), 8);
    assert_eq!(letter_for_decile(decile(85.0)), Some("B"));
    assert_eq!(decile(95.0), 9);
    assert_eq!(letter_for_decile(decile(95.0)), Some("A"));
    assert_eq!(letter_for_decile(decile(65.0)), Some("D"));
    assert_eq!(letter_for_decile(decile(100.0)), Some("A"));
    assert_eq!(letter_for_decile(decile(72.0)), Some("C"));
    assert_eq!(letter_for_decile(decile(12.0)), Some("F"));
    assert_eq!(decile(-1.0), -1);
    assert_eq!(letter_for_decile(-1), Some("-"));
    assert_eq!(letter_for_decile(13), None);
    assert_eq!(letter_for_decile(-2), None);
}

#[test]
fn deciles_floor_without_rounding() {
    assert_eq!(decile(89.5), 8);
    assert_eq!(letter_for_decile(decile(89.6)), Some("B"));
    assert_eq!(letter_for_decile(decile(59.99)), Some("F"));
    assert_eq!(letter_for_decile(decile(90.0)), Some("A"));

    let content = "Student ID,Course,Period,Average\n100001,Geometry,1,89.6\n";
    let table = CurrentGradesReader::default()
        .parse(content)
        .expect("grades parse failed");
    assert_eq!(text(&table, 100001, "period_1").as_deref(), Some("90%"));
    assert_eq!(text(&table, 100001, "period_1_letter").as_deref(), Some("B"));
}

#[test]
fn nan_average_is_missing() {
    let content = "Student ID,Course,Period,Average\n100001,Geometry,1,nan\n100001,Biology,2,NaN\n";
    let table = CurrentGradesReader::default()
        .parse(content)
        .expect("grades parse failed");

    assert_eq!(table.cell(StudentId(100001), "period_1"), Some(&Cell::Missing));
    assert_eq!(text(&table, 100001, "period_1_letter").as_deref(), Some("-"));
    assert_eq!(table.cell(StudentId(100001), "period_2"), Some(&Cell::Missing));
}

#[test]
fn negative_average_other_than_sentinel_is_fatal() {
    for average in ["-5", "-0.5", "inf"] {
        let content = format!("Student ID,Course,Period,Average\n100001,Geometry,1,{average}\n");
        match CurrentGradesReader::default().parse(&content) {
            Err(ParserError::Unmappable { value, line_index, .. }) => {
                assert_eq!(value, average);
                assert_eq!(line_index, 2);
            }
            other => panic!("expected Unmappable for {average}, got {other:?}"),
        }
    }
}

#[test]
fn current_grades_pivot_by_period() {
    let table = CurrentGradesReader::default()
        .parse(&fixture("current_grades.csv"))
        .expect("grades parse failed");

    assert_eq!(table.len(), 5);
    assert_eq!(table.columns().len(), 16);

    assert_eq!(text(&table, 100001, "period_1").as_deref(), Some("85%"));
    assert_eq!(text(&table, 100001, "period_1_letter").as_deref(), Some("B"));
    assert_eq!(text(&table, 100001, "period_6").as_deref(), Some("72%"));
    assert_eq!(text(&table, 100001, "period_6_letter").as_deref(), Some("C"));
    assert_eq!(text(&table, 100002, "period_1_letter").as_deref(), Some("D"));
    assert_eq!(text(&table, 100002, "period_2_letter").as_deref(), Some("F"));
    assert_eq!(text(&table, 100004, "period_1_letter").as_deref(), Some("A"));
}

#[test]
fn non_academic_periods_pass_through() {
    let table = CurrentGradesReader::default()
        .parse(&fixture("current_grades.csv"))
        .expect("grades parse failed");

    assert_eq!(
        table.cell(StudentId(100001), "period_4"),
        Some(&Cell::NonAcademic("Lunch".to_string()))
    );
    assert_eq!(
        table.cell(StudentId(100001), "period_4_letter"),
        Some(&Cell::NonAcademic("Lunch".to_string()))
    );
}

#[test]
fn missing_grades_get_dash_letter() {
    let table = CurrentGradesReader::default()
        .parse(&fixture("current_grades.csv"))
        .expect("grades parse failed");

    // -1 sentinel
    assert_eq!(table.cell(StudentId(100001), "period_5"), Some(&Cell::Missing));
    assert_eq!(text(&table, 100001, "period_5_letter").as_deref(), Some("-"));
    // no class that period
    assert_eq!(table.cell(StudentId(100005), "period_1"), Some(&Cell::Missing));
    assert_eq!(text(&table, 100005, "period_1_letter").as_deref(), Some("-"));
}

#[test]
fn double_periods_backfill_split_columns() {
    let table = CurrentGradesReader::default()
        .parse(&fixture("current_grades.csv"))
        .expect("grades parse failed");

    assert_eq!(text(&table, 100001, "period_2").as_deref(), Some("95%"));
    assert_eq!(text(&table, 100001, "period_3").as_deref(), Some("95%"));
    assert_eq!(text(&table, 100001, "period_3_letter").as_deref(), Some("A"));

    // zero-padded periods normalize; an existing split grade is not overwritten
    assert_eq!(text(&table, 100003, "period_1").as_deref(), Some("90%"));
    assert_eq!(text(&table, 100003, "period_1_letter").as_deref(), Some("B"));
    assert_eq!(text(&table, 100003, "period_2").as_deref(), Some("79%"));
    assert_eq!(text(&table, 100003, "period_3").as_deref(), Some("81%"));
    assert_eq!(text(&table, 100003, "period_3_letter").as_deref(), Some("B"));
}

#[test]
fn unmappable_grade_is_fatal() {
    let content = "Student ID,Course,Period,Average\n100001,Algebra I,1,135\n";
    match CurrentGradesReader::default().parse(content) {
        Err(ParserError::Unmappable { message, .. }) => {
            assert!(message.contains("decile 13"), "unexpected message: {message}");
        }
        other => panic!("expected Unmappable error, got {other:?}"),
    }
}

#[test]
fn unknown_period_is_fatal() {
    let content = "Student ID,Course,Period,Average\n100001,Algebra I,9,88\n";
    let reader = CurrentGradesReader::new(PeriodLayout::default());
    assert!(matches!(
        reader.parse(content),
        Err(ParserError::Unmappable { .. })
    ));
}

#[test]
fn email_roster_reads_by_offset() {
    let table = EmailReader
        .parse(&fixture("email_roster.csv"))
        .expect("email parse failed");

    assert_eq!(table.len(), 4);
    assert_eq!(
        text(&table, 100003, "email").as_deref(),
        Some("gokafor@cps.edu")
    );
    assert_eq!(table.cell(StudentId(100002), "email"), Some(&Cell::Missing));
    assert!(table.columns()[0].identifying);
}

#[test]
fn schema_registry_lists_each_source_once() {
    let ids: Vec<&str> = all_schemas().iter().map(|schema| schema.id).collect();
    assert_eq!(ids.len(), 9);
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
    assert!(ids.contains(&"current_grades"));
}

#[test]
fn byte_order_mark_is_ignored() {
    let content = format!("\u{feff}{}", fixture("gpa.csv"));
    let table = GpaReader.parse(&content).expect("GPA parse with BOM failed");
    assert_eq!(table.len(), 5);
}
