use std::collections::HashSet;

use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use rollcall_core::completeness::apply_completeness;
use rollcall_core::config::DefaultValues;
use rollcall_core::frame::{build_student_frame, ID_COLUMN};
use rollcall_core::grouping::{mail_merge_sheets, partition_by_grade, report_sheets};
use rollcall_core::merge::{merge_sources, MergedTable};
use rollcall_core::PipelineError;
use rollcall_parser::formats::{EmailReader, GpaReader, SwipeReader};
use rollcall_parser::{Cell, SourceKind, SourceTable, StudentId, StudentRow};

fn merged() -> MergedTable {
    let mut gpa = SourceTable::new(SourceKind::Gpa, GpaReader::columns());
    let students = [
        (1, 9, "Rivera"),
        (2, 9, "Chen"),
        (3, 10, "Okafor"),
        (4, 11, "Novak"),
        (5, 12, "Santos"),
        (6, 12, "Baker"),
    ];
    for (id, grade, last) in students {
        let cells = vec![
            Cell::Integer(grade),
            Cell::text(last),
            Cell::text("First"),
            Cell::Float(3.0),
        ];
        gpa.insert("TEST", StudentId(id), StudentRow::new(cells, 2))
            .expect("insert gpa");
    }

    let mut swipe = SourceTable::new(SourceKind::Swipe, SwipeReader::columns());
    swipe
        .insert(
            "TEST",
            StudentId(4),
            StudentRow::new(vec![Cell::text("March 26"), Cell::text("09:15 AM")], 2),
        )
        .expect("insert swipe");

    let mut email = SourceTable::new(SourceKind::Email, EmailReader::columns());
    for (id, address) in [(1, "arivera1@cps.edu"), (2, ""), (5, "lsantos2@cps.edu")] {
        email
            .insert("TEST", StudentId(id), StudentRow::new(vec![Cell::text(address)], 2))
            .expect("insert email");
    }

    let mut table =
        merge_sources(&[gpa, swipe, email], &DefaultValues::default()).expect("merge failed");
    apply_completeness(&mut table, 1);
    table
}

fn ids(df: &DataFrame) -> Vec<i64> {
    df.column(ID_COLUMN)
        .expect("ID column")
        .i64()
        .expect("ID is i64")
        .into_iter()
        .flatten()
        .collect()
}

#[test]
fn frame_has_id_first_and_typed_columns() {
    let df = build_student_frame(&merged()).expect("frame");

    assert_eq!(df.height(), 6);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names[0], ID_COLUMN);
    assert_eq!(names[1], "grade");
    assert_eq!(names.last().map(String::as_str), Some("email"));

    let gpa = df.column("avg_gpa").expect("gpa").f64().expect("f64");
    assert_eq!(gpa.get(0), Some(3.0));
    let late = df.column("late_time").expect("late").str().expect("str");
    assert_eq!(late.get(0), Some("None!"));
    assert_eq!(late.get(3), Some("09:15 AM"));
}

#[test]
fn grade_partitions_are_exhaustive_and_disjoint() {
    let df = build_student_frame(&merged()).expect("frame");
    let partitions = partition_by_grade(&df).expect("partition");

    assert_eq!(partitions.len(), 4);
    let heights: Vec<usize> = partitions.iter().map(|(_, frame)| frame.height()).collect();
    assert_eq!(heights, vec![2, 1, 1, 2]);

    let mut seen = HashSet::new();
    for (level, frame) in &partitions {
        let grades = frame.column("grade").expect("grade").i64().expect("i64");
        assert!(grades.into_iter().all(|grade| grade == Some(level.as_i64())));
        for id in ids(frame) {
            assert!(seen.insert(id), "student {id} landed in two partitions");
        }
    }
    assert_eq!(seen.len(), df.height());
}

#[test]
fn rows_without_a_grade_cannot_be_partitioned() {
    let columns: Vec<Column> = vec![
        Series::new(ID_COLUMN.into(), [1i64, 2]).into(),
        Series::new("grade".into(), [Some(9i64), None]).into(),
    ];
    let df = DataFrame::new(columns).expect("frame");

    assert!(matches!(
        partition_by_grade(&df),
        Err(PipelineError::Validation(_))
    ));
}

#[test]
fn grade_sheets_exclude_identifying_columns() {
    let table = merged();
    let df = build_student_frame(&table).expect("frame");
    let sheets = report_sheets(&df, &table.identifying_columns()).expect("sheets");

    let names: Vec<&str> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ALL STUDENTS", "GRADE_9", "GRADE_10", "GRADE_11", "GRADE_12"]
    );

    assert!(sheets[0].frame.column("last_name").is_ok());
    assert!(sheets[0].frame.column("email").is_ok());
    for sheet in &sheets[1..] {
        for hidden in ["last_name", "first_name", "email"] {
            assert!(
                sheet.frame.column(hidden).is_err(),
                "{} should not carry {hidden}",
                sheet.name
            );
        }
        assert!(sheet.frame.column("avg_gpa").is_ok());
    }
}

#[test]
fn mail_merge_keeps_only_students_with_email() {
    let df = build_student_frame(&merged()).expect("frame");
    let sheets = mail_merge_sheets(&df).expect("mail merge");

    assert_eq!(sheets.len(), 5);
    assert_eq!(ids(&sheets[0].frame), vec![1, 5]);
    assert_eq!(ids(&sheets[1].frame), vec![1]);
    assert_eq!(sheets[2].frame.height(), 0);
    assert!(sheets[4].frame.column("last_name").is_ok());
}
